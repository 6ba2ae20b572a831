//! # Physics Simulation Core
//!
//! [`HalfCheetah`] owns the generalised state and is the only entry point
//! environments use to advance time.

use crate::cheetah::{HalfCheetahConfig, ACTION_DIM, NQ, ROOT_X};
use crate::error::PhysicsError;
use crate::integrator::integrate;

/// Planar half-cheetah simulation.
#[derive(Clone, Debug)]
pub struct HalfCheetah {
    config: HalfCheetahConfig,
    qpos: [f32; NQ],
    qvel: [f32; NQ],
}

impl HalfCheetah {
    #[must_use]
    pub fn new(config: HalfCheetahConfig) -> Self {
        Self {
            config,
            qpos: [0.0; NQ],
            qvel: [0.0; NQ],
        }
    }

    #[must_use]
    pub fn config(&self) -> &HalfCheetahConfig {
        &self.config
    }

    #[must_use]
    pub fn qpos(&self) -> &[f32; NQ] {
        &self.qpos
    }

    #[must_use]
    pub fn qvel(&self) -> &[f32; NQ] {
        &self.qvel
    }

    /// Torso position along the direction of travel.
    #[must_use]
    pub fn position_x(&self) -> f32 {
        self.qpos[ROOT_X]
    }

    #[must_use]
    pub fn timestep(&self) -> f32 {
        self.config.timestep
    }

    #[must_use]
    pub fn frame_skip(&self) -> usize {
        self.config.frame_skip
    }

    /// Effective timestep of one environment step: `timestep * frame_skip`.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.config.timestep * self.config.frame_skip as f32
    }

    /// Overwrites the full state.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::StateDimension`] if either slice does not
    /// have exactly [`NQ`] entries.
    pub fn set_state(&mut self, qpos: &[f32], qvel: &[f32]) -> Result<(), PhysicsError> {
        for v in [qpos, qvel] {
            if v.len() != NQ {
                return Err(PhysicsError::StateDimension {
                    expected: NQ,
                    got: v.len(),
                });
            }
        }
        self.qpos.copy_from_slice(qpos);
        self.qvel.copy_from_slice(qvel);
        Ok(())
    }

    /// Applies `ctrl` (clamped to `[-1, 1]`) for `n_frames` frames.
    ///
    /// # Errors
    ///
    /// Fails without touching the state if `ctrl` has the wrong length or a
    /// non-finite entry, and with [`PhysicsError::Diverged`] if the state
    /// stops being finite.
    pub fn do_simulation(&mut self, ctrl: &[f32], n_frames: usize) -> Result<(), PhysicsError> {
        if ctrl.len() != ACTION_DIM {
            return Err(PhysicsError::ActionDimension {
                expected: ACTION_DIM,
                got: ctrl.len(),
            });
        }
        if let Some((index, &value)) = ctrl.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(PhysicsError::NonFiniteControl { index, value });
        }
        let mut clamped = [0.0; ACTION_DIM];
        for (c, &u) in clamped.iter_mut().zip(ctrl) {
            *c = u.clamp(-1.0, 1.0);
        }

        let substeps = self.config.solver_substeps.max(1);
        let h = self.config.timestep / substeps as f32;
        for frame in 0..n_frames {
            for _ in 0..substeps {
                integrate(&self.config, &mut self.qpos, &mut self.qvel, &clamped, h);
            }
            if !self.is_finite() {
                tracing::warn!(frame, "half-cheetah state became non-finite");
                return Err(PhysicsError::Diverged {
                    steps: (frame + 1) * substeps,
                });
            }
        }
        Ok(())
    }

    fn is_finite(&self) -> bool {
        self.qpos.iter().chain(self.qvel.iter()).all(|v| v.is_finite())
    }
}
