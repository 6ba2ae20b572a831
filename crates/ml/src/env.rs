use std::collections::BTreeMap;
use std::fmt;

use physics::PhysicsError;
use thiserror::Error;

/// Named diagnostic scalars attached to a step.
pub type EnvInfo = BTreeMap<String, f32>;

/// Result of advancing an environment by one action.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub observation: Vec<f32>,
    pub reward: f32,
    /// Episode termination. Time limits are enforced by the sampler, not here.
    pub done: bool,
    pub info: EnvInfo,
}

/// Observation and action dimensionality of an environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvSpec {
    pub observation_dim: usize,
    pub action_dim: usize,
}

#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error("environment has been closed")]
    Closed,
}

/// Reinforcement learning environment trait.
///
/// Inspired by classic frameworks like OpenAI Gym, this trait defines the core
/// interface an environment must provide. Each call to [`step`] advances the
/// simulation by one action and returns the new observation vector, a reward
/// signal, whether the episode has terminated, and diagnostic info.
///
/// Environments are not meant to be shared between threads; each rollout
/// worker builds and owns its own instance.
///
/// [`step`]: Env::step
pub trait Env: Send {
    /// Reset the environment to a (noisy) starting state and return the
    /// initial observation vector.
    ///
    /// # Errors
    ///
    /// Fails if the simulator rejects the starting state or the
    /// environment has been closed.
    fn reset(&mut self) -> Result<Vec<f32>, EnvError>;

    /// Advance the environment by one action.
    ///
    /// # Errors
    ///
    /// Propagates simulator failures (malformed actions, divergence) and
    /// refuses to step a closed environment.
    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError>;

    fn spec(&self) -> EnvSpec;

    /// Reseed the environment's own random source.
    fn seed(&mut self, seed: u64);

    /// Release the environment. Further `reset` and `step` calls fail.
    fn close(&mut self) {}
}

/// An environment whose reward is parameterised by a swappable task.
pub trait TaskEnv: Env {
    type Task: Clone + fmt::Debug + Send + Sync + 'static;

    /// Draw `num_tasks` independent tasks from the environment's own RNG.
    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<Self::Task>;

    /// Replace the active task. Simulator state is left untouched; the new
    /// task applies from the next `step`.
    fn set_task(&mut self, task: &Self::Task);

    fn task(&self) -> &Self::Task;
}
