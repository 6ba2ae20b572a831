//! Half-cheetah model description and forward kinematics.
//!
//! The runner is a torso with a three-segment leg at each end. Generalised
//! coordinates follow the classic layout:
//!
//! | index | coordinate |
//! |-------|------------|
//! | 0 | `rootx` (slide) |
//! | 1 | `rootz` (slide, relative to the initial height) |
//! | 2 | `rooty` (pitch hinge) |
//! | 3..6 | back thigh, shin, foot |
//! | 6..9 | front thigh, shin, foot |

use crate::types::{ContactPoint, Vec2};

/// Number of generalised coordinates.
pub const NQ: usize = 9;
/// Number of actuated joints.
pub const ACTION_DIM: usize = 6;

pub const ROOT_X: usize = 0;
pub const ROOT_Z: usize = 1;
pub const ROOT_PITCH: usize = 2;
/// First actuated coordinate; actuator `i` drives `qpos[FIRST_JOINT + i]`.
pub const FIRST_JOINT: usize = 3;

/// Number of contact points produced by [`HalfCheetahConfig::contact_points`].
pub const N_CONTACTS: usize = 8;

/// One actuated hinge and the segment hanging from it.
#[derive(Clone, Debug, PartialEq)]
pub struct JointSpec {
    pub name: &'static str,
    /// Joint limits in radians.
    pub range: (f32, f32),
    /// Passive spring pulling the joint to zero.
    pub stiffness: f32,
    pub damping: f32,
    /// Actuator gear: torque = gear * ctrl.
    pub gear: f32,
    /// Effective (diagonal) inertia of the coordinate.
    pub inertia: f32,
    /// Length of the segment distal to this joint.
    pub length: f32,
    /// Segment angle relative to its parent at `q = 0`.
    pub rest_angle: f32,
}

/// Physical parameters of the half-cheetah.
#[derive(Clone, Debug)]
pub struct HalfCheetahConfig {
    /// Integration timestep of one frame (seconds).
    pub timestep: f32,
    /// Frames advanced per environment step.
    pub frame_skip: usize,
    /// Solver sub-steps per frame.
    pub solver_substeps: usize,
    pub gravity: f32,
    pub torso_mass: f32,
    pub torso_inertia: f32,
    pub torso_half_length: f32,
    /// Height of the root when `rootz == 0`.
    pub init_height: f32,
    pub contact_stiffness: f32,
    pub contact_damping: f32,
    /// Viscous tangential coefficient, capped by Coulomb friction.
    pub contact_slip_damping: f32,
    pub friction: f32,
    pub limit_stiffness: f32,
    /// Back leg (thigh, shin, foot) then front leg (thigh, shin, foot).
    pub joints: [JointSpec; ACTION_DIM],
}

impl Default for HalfCheetahConfig {
    fn default() -> Self {
        Self {
            timestep: 0.01,
            frame_skip: 5,
            solver_substeps: 4,
            gravity: 9.81,
            torso_mass: 14.0,
            torso_inertia: 1.5,
            torso_half_length: 0.5,
            init_height: 0.72,
            contact_stiffness: 4000.0,
            contact_damping: 80.0,
            contact_slip_damping: 80.0,
            friction: 0.4,
            limit_stiffness: 400.0,
            joints: [
                JointSpec {
                    name: "bthigh",
                    range: (-0.52, 1.05),
                    stiffness: 240.0,
                    damping: 6.0,
                    gear: 120.0,
                    inertia: 1.0,
                    length: 0.29,
                    rest_angle: 0.0,
                },
                JointSpec {
                    name: "bshin",
                    range: (-0.785, 0.785),
                    stiffness: 180.0,
                    damping: 4.5,
                    gear: 90.0,
                    inertia: 0.8,
                    length: 0.30,
                    rest_angle: 0.0,
                },
                JointSpec {
                    name: "bfoot",
                    range: (-0.4, 0.785),
                    stiffness: 120.0,
                    damping: 3.0,
                    gear: 60.0,
                    inertia: 0.6,
                    length: 0.14,
                    rest_angle: 0.0,
                },
                JointSpec {
                    name: "fthigh",
                    range: (-1.0, 0.7),
                    stiffness: 180.0,
                    damping: 4.5,
                    gear: 120.0,
                    inertia: 1.0,
                    length: 0.27,
                    rest_angle: 0.0,
                },
                JointSpec {
                    name: "fshin",
                    range: (-1.2, 0.87),
                    stiffness: 120.0,
                    damping: 3.0,
                    gear: 60.0,
                    inertia: 0.6,
                    length: 0.26,
                    rest_angle: 0.0,
                },
                JointSpec {
                    name: "ffoot",
                    range: (-0.5, 0.5),
                    stiffness: 60.0,
                    damping: 1.5,
                    gear: 30.0,
                    inertia: 0.4,
                    length: 0.18,
                    rest_angle: 0.0,
                },
            ],
        }
    }
}

impl HalfCheetahConfig {
    /// Diagonal of the generalised inertia matrix.
    #[must_use]
    pub fn inertia_diagonal(&self) -> [f32; NQ] {
        let mut m = [0.0; NQ];
        m[ROOT_X] = self.torso_mass;
        m[ROOT_Z] = self.torso_mass;
        m[ROOT_PITCH] = self.torso_inertia;
        for (i, joint) in self.joints.iter().enumerate() {
            m[FIRST_JOINT + i] = joint.inertia;
        }
        m
    }

    /// World position of the root for the given `qpos`.
    #[must_use]
    pub fn root(&self, qpos: &[f32]) -> Vec2 {
        Vec2::new(qpos[ROOT_X], self.init_height + qpos[ROOT_Z])
    }

    /// Every ground-contact candidate with its Jacobian: for each leg the
    /// hip, knee, ankle and toe (back leg first).
    #[must_use]
    pub fn contact_points(&self, qpos: &[f32]) -> [ContactPoint; N_CONTACTS] {
        let root = self.root(qpos);
        let pitch = qpos[ROOT_PITCH];
        let mut out = [ContactPoint {
            pos: Vec2::ZERO,
            jacobian: [Vec2::ZERO; NQ],
        }; N_CONTACTS];

        for (leg, side) in [-1.0_f32, 1.0].into_iter().enumerate() {
            let hip = root + Vec2::new(side * self.torso_half_length, 0.0).rotate(pitch);
            // pivots[k] is the joint k of this leg; chain[k] the point after segment k.
            let mut chain = [hip; 4];
            let mut angle = pitch;
            for k in 0..3 {
                let spec = &self.joints[leg * 3 + k];
                angle += spec.rest_angle + qpos[FIRST_JOINT + leg * 3 + k];
                chain[k + 1] = chain[k] + Vec2::new(0.0, -spec.length).rotate(angle);
            }

            for (n, &pos) in chain.iter().enumerate() {
                let mut jacobian = [Vec2::ZERO; NQ];
                jacobian[ROOT_X] = Vec2::new(1.0, 0.0);
                jacobian[ROOT_Z] = Vec2::new(0.0, 1.0);
                jacobian[ROOT_PITCH] = (pos - root).perp();
                // Joint k moves every chain point strictly below it.
                for (k, pivot) in chain.iter().enumerate().take(n) {
                    jacobian[FIRST_JOINT + leg * 3 + k] = (pos - *pivot).perp();
                }
                out[leg * 4 + n] = ContactPoint { pos, jacobian };
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_pose_hangs_legs_straight_down() {
        let config = HalfCheetahConfig::default();
        let points = config.contact_points(&[0.0; NQ]);
        let back_toe = points[3].pos;
        let front_toe = points[7].pos;
        assert!((back_toe.x + 0.5).abs() < 1e-6);
        assert!((front_toe.x - 0.5).abs() < 1e-6);
        assert!((back_toe.z - (0.72 - 0.73)).abs() < 1e-5);
        assert!((front_toe.z - (0.72 - 0.71)).abs() < 1e-5);
    }

    #[test]
    fn jacobian_matches_finite_difference() {
        let config = HalfCheetahConfig::default();
        let qpos = [0.1, -0.05, 0.2, 0.3, -0.4, 0.1, -0.2, 0.5, -0.1];
        let points = config.contact_points(&qpos);
        let eps = 1e-3;
        for coord in 0..NQ {
            let mut shifted = qpos;
            shifted[coord] += eps;
            let moved = config.contact_points(&shifted);
            for (p, m) in points.iter().zip(moved.iter()) {
                let fd = (m.pos - p.pos) * (1.0 / eps);
                let err = (fd - p.jacobian[coord]).length();
                assert!(err < 5e-3, "coord {coord}: err {err}");
            }
        }
    }
}
