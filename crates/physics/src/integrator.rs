//! # Physics Integration
//!
//! Generalised-force assembly and semi-implicit Euler integration for the
//! planar runner.

use crate::cheetah::{HalfCheetahConfig, FIRST_JOINT, NQ, ROOT_Z};
use crate::types::{ContactPoint, Vec2};

/// Penalty-spring ground reaction at a single contact point. Returns zero
/// when the point is above the ground plane `z = 0`.
#[must_use]
pub fn contact_force(config: &HalfCheetahConfig, point: &ContactPoint, qvel: &[f32]) -> Vec2 {
    let depth = -point.pos.z;
    if depth <= 0.0 {
        return Vec2::ZERO;
    }
    let vel = point.velocity(qvel);
    let normal = (config.contact_stiffness * depth - config.contact_damping * vel.z).max(0.0);
    let limit = config.friction * normal;
    let tangent = (-config.contact_slip_damping * vel.x).clamp(-limit, limit);
    Vec2::new(tangent, normal)
}

/// Sum of all forces acting on each generalised coordinate.
#[must_use]
pub fn generalized_forces(
    config: &HalfCheetahConfig,
    qpos: &[f32],
    qvel: &[f32],
    ctrl: &[f32],
) -> [f32; NQ] {
    let mut forces = [0.0; NQ];
    forces[ROOT_Z] -= config.torso_mass * config.gravity;

    for point in &config.contact_points(qpos) {
        let f = contact_force(config, point, qvel);
        if f == Vec2::ZERO {
            continue;
        }
        for (q, j) in forces.iter_mut().zip(point.jacobian.iter()) {
            *q += j.dot(f);
        }
    }

    for (i, joint) in config.joints.iter().enumerate() {
        let idx = FIRST_JOINT + i;
        let angle = qpos[idx];
        let mut torque = joint.gear * ctrl[i] - joint.stiffness * angle - joint.damping * qvel[idx];
        let (lo, hi) = joint.range;
        if angle < lo {
            torque += config.limit_stiffness * (lo - angle);
        } else if angle > hi {
            torque -= config.limit_stiffness * (angle - hi);
        }
        forces[idx] += torque;
    }
    forces
}

/// Advances the state by `dt` with semi-implicit Euler: velocities first,
/// then positions with the updated velocities.
pub fn integrate(
    config: &HalfCheetahConfig,
    qpos: &mut [f32; NQ],
    qvel: &mut [f32; NQ],
    ctrl: &[f32],
    dt: f32,
) {
    let forces = generalized_forces(config, qpos, qvel, ctrl);
    let inertia = config.inertia_diagonal();
    for i in 0..NQ {
        qvel[i] += forces[i] / inertia[i] * dt;
        qpos[i] += qvel[i] * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cheetah::ACTION_DIM;

    #[test]
    fn airborne_body_falls_with_gravity() {
        let config = HalfCheetahConfig::default();
        let mut qpos = [0.0; NQ];
        qpos[ROOT_Z] = 5.0;
        let mut qvel = [0.0; NQ];
        integrate(&config, &mut qpos, &mut qvel, &[0.0; ACTION_DIM], 0.01);
        assert!((qvel[ROOT_Z] + 9.81 * 0.01).abs() < 1e-5);
    }

    #[test]
    fn ground_pushes_penetrating_points_up() {
        let config = HalfCheetahConfig::default();
        let mut qpos = [0.0; NQ];
        qpos[ROOT_Z] = -0.1;
        let forces = generalized_forces(&config, &qpos, &[0.0; NQ], &[0.0; ACTION_DIM]);
        assert!(forces[ROOT_Z] > 0.0, "net vertical force {}", forces[ROOT_Z]);
    }

    #[test]
    fn friction_is_bounded_by_normal_force() {
        let config = HalfCheetahConfig::default();
        let point = ContactPoint {
            pos: Vec2::new(0.0, -0.01),
            jacobian: {
                let mut j = [Vec2::ZERO; NQ];
                j[0] = Vec2::new(1.0, 0.0);
                j
            },
        };
        let mut qvel = [0.0; NQ];
        qvel[0] = 100.0;
        let f = contact_force(&config, &point, &qvel);
        assert!((f.x.abs() - config.friction * f.z).abs() < 1e-4);
        assert!(f.x < 0.0);
    }
}
