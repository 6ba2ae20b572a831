//! Half-cheetah with a target direction.
//!
//! Each step the cheetah receives a reward equal to its velocity in the
//! target direction minus a control cost. Tasks are generated by sampling the
//! direction from a Bernoulli distribution on {-1, 1} with parameter 0.5
//! (-1: backward, +1: forward), as in the MAML locomotion benchmarks.

use rand::Rng;

use crate::env::{Env, EnvError, EnvInfo, EnvSpec, Step, TaskEnv};
use crate::envs::half_cheetah::{squared_norm, HalfCheetahEnv};
use crate::task::{Direction, DirectionTask};

/// Weight of the squared-action control cost: `0.5 * 1e-1`.
pub const CONTROL_COST_WEIGHT: f32 = 0.5 * 1e-1;

/// Decomposed reward of one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewardTerms {
    /// `direction * forward_velocity`.
    pub forward: f32,
    /// Negated control cost; never positive.
    pub ctrl: f32,
}

impl RewardTerms {
    #[must_use]
    pub fn total(&self) -> f32 {
        self.forward + self.ctrl
    }
}

/// `0.5 * 0.1 * Σ aᵢ²`.
#[must_use]
pub fn control_cost(action: &[f32]) -> f32 {
    CONTROL_COST_WEIGHT * squared_norm(action)
}

#[must_use]
pub fn directional_reward(direction: Direction, forward_velocity: f32, action: &[f32]) -> RewardTerms {
    RewardTerms {
        forward: direction.sign() * forward_velocity,
        ctrl: -control_cost(action),
    }
}

#[derive(Clone, Debug, Default)]
pub struct HalfCheetahDirEnv {
    base: HalfCheetahEnv,
    task: DirectionTask,
}

impl HalfCheetahDirEnv {
    /// Forward-running cheetah.
    #[must_use]
    pub fn new() -> Self {
        Self::with_task(DirectionTask::default())
    }

    #[must_use]
    pub fn with_task(task: DirectionTask) -> Self {
        Self {
            base: HalfCheetahEnv::new(),
            task,
        }
    }

    #[must_use]
    pub fn base(&self) -> &HalfCheetahEnv {
        &self.base
    }
}

impl Env for HalfCheetahDirEnv {
    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        self.base.reset()
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        let forward_velocity = self.base.advance(action)?;
        let direction = self.task.direction;
        let terms = directional_reward(direction, forward_velocity, action);

        let mut info = EnvInfo::new();
        info.insert("reward_forward".into(), terms.forward);
        info.insert("reward_ctrl".into(), terms.ctrl);
        info.insert("task_dir".into(), direction.sign());
        Ok(Step {
            observation: self.base.observation(),
            reward: terms.total(),
            done: false,
            info,
        })
    }

    fn spec(&self) -> EnvSpec {
        self.base.spec()
    }

    fn seed(&mut self, seed: u64) {
        self.base.seed(seed);
    }

    fn close(&mut self) {
        self.base.close();
    }
}

impl TaskEnv for HalfCheetahDirEnv {
    type Task = DirectionTask;

    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<DirectionTask> {
        let rng = self.base.rng_mut();
        (0..num_tasks)
            .map(|_| {
                let direction = if rng.gen_bool(0.5) {
                    Direction::Forward
                } else {
                    Direction::Backward
                };
                DirectionTask::new(direction)
            })
            .collect()
    }

    fn set_task(&mut self, task: &DirectionTask) {
        self.task = *task;
    }

    fn task(&self) -> &DirectionTask {
        &self.task
    }
}
