use crate::env::{Env, EnvError, EnvSpec, Step, TaskEnv};

/// RL² observation wrapper.
///
/// Every observation is extended with the previous action, the previous
/// reward and the previous done flag so a policy can infer the task from its
/// own history. After `reset` those slots are zero.
#[derive(Clone, Debug)]
pub struct Rl2Env<E> {
    inner: E,
}

impl<E: Env> Rl2Env<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Env> Env for Rl2Env<E> {
    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        let action_dim = self.inner.spec().action_dim;
        let mut obs = self.inner.reset()?;
        obs.extend(std::iter::repeat(0.0).take(action_dim + 2));
        Ok(obs)
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        let mut step = self.inner.step(action)?;
        step.observation.extend_from_slice(action);
        step.observation.push(step.reward);
        step.observation.push(if step.done { 1.0 } else { 0.0 });
        Ok(step)
    }

    fn spec(&self) -> EnvSpec {
        let inner = self.inner.spec();
        EnvSpec {
            observation_dim: inner.observation_dim + inner.action_dim + 2,
            action_dim: inner.action_dim,
        }
    }

    fn seed(&mut self, seed: u64) {
        self.inner.seed(seed);
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

impl<E: TaskEnv> TaskEnv for Rl2Env<E> {
    type Task = E::Task;

    fn sample_tasks(&mut self, num_tasks: usize) -> Vec<E::Task> {
        self.inner.sample_tasks(num_tasks)
    }

    fn set_task(&mut self, task: &E::Task) {
        self.inner.set_task(task);
    }

    fn task(&self) -> &E::Task {
        self.inner.task()
    }
}
