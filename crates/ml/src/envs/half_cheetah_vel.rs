//! Half-cheetah with a goal velocity, sampled uniformly from `[0, 2)`.

use rand::Rng;

use crate::env::{Env, EnvError, EnvInfo, EnvSpec, Step, TaskEnv};
use crate::envs::half_cheetah::HalfCheetahEnv;
use crate::envs::half_cheetah_dir::control_cost;
use crate::task::VelocityTask;

pub const MAX_GOAL_VELOCITY: f32 = 2.0;

#[derive(Clone, Debug, Default)]
pub struct HalfCheetahVelEnv {
    base: HalfCheetahEnv,
    task: VelocityTask,
}

impl HalfCheetahVelEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::with_task(VelocityTask::default())
    }

    #[must_use]
    pub fn with_task(task: VelocityTask) -> Self {
        Self {
            base: HalfCheetahEnv::new(),
            task,
        }
    }
}

impl Env for HalfCheetahVelEnv {
    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        self.base.reset()
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        let forward_velocity = self.base.advance(action)?;
        let reward_forward = -(forward_velocity - self.task.velocity).abs();
        let reward_ctrl = -control_cost(action);

        let mut info = EnvInfo::new();
        info.insert("reward_forward".into(), reward_forward);
        info.insert("reward_ctrl".into(), reward_ctrl);
        info.insert("task_vel".into(), self.task.velocity);
        info.insert("forward_vel".into(), forward_velocity);
        Ok(Step {
            observation: self.base.observation(),
            reward: reward_forward + reward_ctrl,
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

impl TaskEnv for HalfCheetahVelEnv {
    type Task = VelocityTask;

    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<VelocityTask> {
        let rng = self.base.rng_mut();
        (0..num_tasks)
            .map(|_| VelocityTask {
                velocity: rng.gen_range(0.0..MAX_GOAL_VELOCITY),
            })
            .collect()
    }

    fn set_task(&mut self, task: &VelocityTask) {
        self.task = *task;
    }

    fn task(&self) -> &VelocityTask {
        &self.task
    }
}
