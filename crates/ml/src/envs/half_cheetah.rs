use physics::cheetah::NQ;
use physics::{HalfCheetah, HalfCheetahConfig, ACTION_DIM};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::env::{EnvError, EnvSpec};

/// Observation size: `qpos` without the torso x position, then `qvel`.
pub const OBSERVATION_DIM: usize = NQ - 1 + NQ;

const RESET_POS_NOISE: f32 = 0.1;
const RESET_VEL_NOISE: f32 = 0.1;

/// Sum of squared action entries.
#[must_use]
pub fn squared_norm(action: &[f32]) -> f32 {
    action.iter().map(|a| a * a).sum()
}

/// Shared half-cheetah machinery: the simulator plus the environment's
/// own seeded random source.
///
/// This is not an [`Env`](crate::env::Env) by itself. It has no reward;
/// each task variant advances it with [`HalfCheetahEnv::advance`] and scores
/// the resulting forward velocity.
#[derive(Clone, Debug)]
pub struct HalfCheetahEnv {
    sim: HalfCheetah,
    rng: ChaCha8Rng,
    closed: bool,
}

impl Default for HalfCheetahEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl HalfCheetahEnv {
    /// Creates an environment with the default model, seeded from entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HalfCheetahConfig::default())
    }

    #[must_use]
    pub fn with_config(config: HalfCheetahConfig) -> Self {
        Self {
            sim: HalfCheetah::new(config),
            rng: ChaCha8Rng::from_entropy(),
            closed: false,
        }
    }

    #[must_use]
    pub fn sim(&self) -> &HalfCheetah {
        &self.sim
    }

    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    #[must_use]
    pub fn observation(&self) -> Vec<f32> {
        let mut obs = Vec::with_capacity(OBSERVATION_DIM);
        obs.extend_from_slice(&self.sim.qpos()[1..]);
        obs.extend_from_slice(self.sim.qvel());
        obs
    }

    /// Puts the model in a noisy starting pose and returns the first
    /// observation.
    ///
    /// # Errors
    ///
    /// Fails if the environment is closed or the simulator rejects the
    /// starting state.
    pub fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        let mut qpos = [0.0; NQ];
        let mut qvel = [0.0; NQ];
        for q in &mut qpos {
            *q = self.rng.gen_range(-RESET_POS_NOISE..RESET_POS_NOISE);
        }
        for v in &mut qvel {
            let n: f32 = self.rng.sample(StandardNormal);
            *v = RESET_VEL_NOISE * n;
        }
        self.sim.set_state(&qpos, &qvel)?;
        Ok(self.observation())
    }

    /// Runs `frame_skip` frames under `action` and returns the torso's
    /// forward velocity over the step.
    ///
    /// # Errors
    ///
    /// Fails if the environment is closed or the simulator rejects the
    /// action.
    pub fn advance(&mut self, action: &[f32]) -> Result<f32, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        let before = self.sim.position_x();
        let frames = self.sim.frame_skip();
        self.sim.do_simulation(action, frames)?;
        Ok((self.sim.position_x() - before) / self.sim.dt())
    }

    #[must_use]
    pub fn spec(&self) -> EnvSpec {
        EnvSpec {
            observation_dim: OBSERVATION_DIM,
            action_dim: ACTION_DIM,
        }
    }

    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
