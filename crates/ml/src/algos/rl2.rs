//! RL²: meta-learning by training a policy across trials of consecutive
//! episodes on one task.

use anyhow::{ensure, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::ppo::{Ppo, PpoStats};
use crate::logger::Logger;
use crate::policy::GaussianGruPolicy;
use crate::sampler::TaskRollout;
use crate::task_sampler::{EnvUpdate, TaskSampler};
use crate::trajectory::{log_performance, Path};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rl2Config {
    /// Tasks sampled per iteration.
    pub meta_batch_size: usize,
    pub max_path_length: usize,
    pub episodes_per_task: usize,
    /// Training iterations per epoch.
    pub steps_per_epoch: usize,
    pub discount: f32,
}

impl Default for Rl2Config {
    fn default() -> Self {
        Self {
            meta_batch_size: 50,
            max_path_length: 150,
            episodes_per_task: 10,
            steps_per_epoch: 10,
            discount: 0.99,
        }
    }
}

/// Outer meta-algorithm wrapping an inner [`Ppo`].
pub struct Rl2<E> {
    config: Rl2Config,
    policy: GaussianGruPolicy,
    inner: Ppo,
    task_sampler: Box<dyn TaskSampler<E>>,
    rng: ChaCha8Rng,
}

impl<E> Rl2<E> {
    pub fn new(
        config: Rl2Config,
        policy: GaussianGruPolicy,
        inner: Ppo,
        task_sampler: Box<dyn TaskSampler<E>>,
        seed: u64,
    ) -> Self {
        Self {
            config,
            policy,
            inner,
            task_sampler,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Rl2Config {
        &self.config
    }

    #[must_use]
    pub fn policy(&self) -> &GaussianGruPolicy {
        &self.policy
    }

    #[must_use]
    pub fn inner(&self) -> &Ppo {
        &self.inner
    }

    /// Draws `meta_batch_size` task updates for the next iteration.
    pub fn sample_tasks(&mut self) -> Vec<EnvUpdate<E>> {
        self.task_sampler.sample(self.config.meta_batch_size)
    }

    /// Trains on one iteration's trials and returns the average undiscounted
    /// episode return.
    ///
    /// # Errors
    ///
    /// Fails when no episodes were collected or the policy update fails.
    pub fn train_once(&mut self, itr: u64, rollouts: &[TaskRollout], logger: &mut Logger) -> Result<f32> {
        let episodes: Vec<Path> = rollouts.iter().flat_map(|r| r.paths.iter().cloned()).collect();
        ensure!(!episodes.is_empty(), "iteration {itr} collected no episodes");

        let returns = log_performance(logger, "Evaluation", &episodes, self.config.discount);
        let average = returns.iter().sum::<f32>() / returns.len() as f32;

        let trials: Vec<Path> = rollouts.iter().map(|r| Path::concat(&r.paths)).collect();
        let PpoStats { loss_before, loss_after, .. } =
            self.inner.optimize_policy(&mut self.policy, &trials, &mut self.rng, logger)?;
        tracing::debug!(itr, average, loss_before, loss_after, "rl2 iteration");
        Ok(average)
    }
}
