use anyhow::Result;

use crate::deterministic::derive_seed;
use crate::env::Env;
use crate::logger::Logger;
use crate::policy::GaussianGruPolicy;
use crate::sampler::{make_sampler, Sampler, SamplerConfig};
use crate::task_sampler::TaskSampler;
use crate::trajectory::{log_performance, Path};

const EVAL_STREAM: u64 = 0x4D45_5441;

#[derive(Clone, Debug, PartialEq)]
pub struct MetaEvaluatorConfig {
    pub n_test_tasks: usize,
    /// Episodes the agent may spend exploring a test task before scoring.
    pub n_exploration_traj: usize,
    pub n_test_rollouts: usize,
    pub max_path_length: usize,
    pub discount: f32,
    pub prefix: String,
}

impl Default for MetaEvaluatorConfig {
    fn default() -> Self {
        Self {
            n_test_tasks: 10,
            n_exploration_traj: 10,
            n_test_rollouts: 1,
            max_path_length: 150,
            discount: 0.99,
            prefix: "MetaTest".to_string(),
        }
    }
}

/// Scores the policy on held-out tasks: after `n_exploration_traj` episodes
/// on a task, the following `n_test_rollouts` episodes are reported.
pub struct MetaEvaluator<E> {
    config: MetaEvaluatorConfig,
    test_task_sampler: Box<dyn TaskSampler<E>>,
    sampler: Box<dyn Sampler<E>>,
}

impl<E: Env + 'static> MetaEvaluator<E> {
    /// `sampler_config` selects the worker pool; its trial length and
    /// episode count are overridden by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the evaluation sampler cannot be built.
    pub fn new(
        config: MetaEvaluatorConfig,
        test_task_sampler: Box<dyn TaskSampler<E>>,
        sampler_config: SamplerConfig,
    ) -> Result<Self> {
        let sampler_config = SamplerConfig {
            use_all_workers: false,
            n_paths_per_trial: config.n_exploration_traj + config.n_test_rollouts,
            max_path_length: config.max_path_length,
            ..sampler_config
        };
        Ok(Self {
            config,
            test_task_sampler,
            sampler: make_sampler(sampler_config)?,
        })
    }

    #[must_use]
    pub fn config(&self) -> &MetaEvaluatorConfig {
        &self.config
    }

    /// Rolls out on `n_test_tasks` fresh tasks and logs under the configured
    /// prefix. Returns the scored episode returns.
    ///
    /// # Errors
    ///
    /// Propagates rollout failures.
    pub fn evaluate(&mut self, policy: &GaussianGruPolicy, logger: &mut Logger, seed: u64, itr: u64) -> Result<Vec<f32>> {
        let updates = self.test_task_sampler.sample(self.config.n_test_tasks);
        let rollouts = self
            .sampler
            .obtain_samples(derive_seed(seed, &[EVAL_STREAM]), itr, &updates, policy, None)?;
        let scored: Vec<Path> = rollouts
            .into_iter()
            .flat_map(|r| r.paths.into_iter().skip(self.config.n_exploration_traj))
            .collect();
        Ok(log_performance(logger, &self.config.prefix, &scored, self.config.discount))
    }
}
