//! Rollout collection for meta-RL.
//!
//! A sampler turns a batch of [`EnvUpdate`]s into trials: each job builds
//! a fresh environment from one update and lets an [`Rl2Worker`] roll
//! `n_paths_per_trial` consecutive episodes on it. Jobs are handed out
//! round-robin over the updates until the requested number of environment
//! steps has been collected.
//!
//! Every job derives its RNG seeds from `(seed, iteration, job index)`, so
//! a job produces the same trial on [`LocalSampler`] and
//! [`ParallelSampler`] regardless of thread scheduling.

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::deterministic::derive_seed;
use crate::env::Env;
use crate::policy::GaussianGruPolicy;
use crate::task_sampler::EnvUpdate;
use crate::trajectory::Path;

const ENV_STREAM: u64 = 1;
const POLICY_STREAM: u64 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    Local,
    #[default]
    Parallel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub kind: SamplerKind,
    pub n_workers: usize,
    /// Run a full wave of `n_workers` jobs even when there are fewer tasks.
    pub use_all_workers: bool,
    pub n_paths_per_trial: usize,
    pub max_path_length: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            kind: SamplerKind::Parallel,
            n_workers: rayon::current_num_threads(),
            use_all_workers: true,
            n_paths_per_trial: 10,
            max_path_length: 150,
        }
    }
}

/// All episodes collected on one task by one job.
#[derive(Clone, Debug, Default)]
pub struct TaskRollout {
    pub description: String,
    pub paths: Vec<Path>,
}

impl TaskRollout {
    #[must_use]
    pub fn env_steps(&self) -> usize {
        self.paths.iter().map(Path::len).sum()
    }
}

/// Rolls consecutive episodes on one environment without resetting the
/// agent between them: the policy's hidden state starts from zero once per
/// trial and carries over every episode boundary.
#[derive(Clone, Copy, Debug)]
pub struct Rl2Worker {
    pub n_paths_per_trial: usize,
    pub max_path_length: usize,
}

impl Rl2Worker {
    /// # Errors
    ///
    /// Propagates environment reset and step failures.
    pub fn rollout<E: Env>(
        &self,
        env: &mut E,
        policy: &GaussianGruPolicy,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<Path>> {
        let mut paths = Vec::with_capacity(self.n_paths_per_trial);
        let mut state = policy.initial_state();
        for _ in 0..self.n_paths_per_trial {
            let mut path = Path::default();
            let mut obs = env.reset()?;
            for _ in 0..self.max_path_length {
                let (action, agent_info) = policy.get_action(&mut state, &obs, rng);
                let step = env.step(&action)?;
                path.observations.push(std::mem::replace(&mut obs, step.observation));
                path.actions.push(action);
                path.rewards.push(step.reward);
                path.dones.push(step.done);
                path.env_infos.push(step.info);
                path.agent_infos.push(agent_info);
                if step.done {
                    break;
                }
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Collects trials for a batch of task updates.
pub trait Sampler<E>: Send {
    fn config(&self) -> &SamplerConfig;

    /// Runs jobs over `updates` until at least `batch_size` environment
    /// steps are collected, or exactly one job per update when `batch_size`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Propagates the first failing job.
    fn obtain_samples(
        &mut self,
        seed: u64,
        itr: u64,
        updates: &[EnvUpdate<E>],
        policy: &GaussianGruPolicy,
        batch_size: Option<usize>,
    ) -> Result<Vec<TaskRollout>>;
}

fn run_job<E: Env>(
    worker: Rl2Worker,
    update: &EnvUpdate<E>,
    policy: &GaussianGruPolicy,
    seed: u64,
    itr: u64,
    job: usize,
) -> Result<TaskRollout> {
    let mut env = update.make_env();
    env.seed(derive_seed(seed, &[itr, job as u64, ENV_STREAM]));
    let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, &[itr, job as u64, POLICY_STREAM]));
    let paths = worker
        .rollout(&mut env, policy, &mut rng)
        .with_context(|| format!("rollout on task {}", update.description()))?;
    env.close();
    Ok(TaskRollout {
        description: update.description().to_string(),
        paths,
    })
}

fn worker_for(config: &SamplerConfig) -> Rl2Worker {
    Rl2Worker {
        n_paths_per_trial: config.n_paths_per_trial,
        max_path_length: config.max_path_length,
    }
}

/// Drives waves of jobs until the step budget is met. `run_wave` receives
/// the job indices of one wave and returns their rollouts in order.
fn collect_waves<F>(n_updates: usize, wave_width: usize, batch_size: Option<usize>, mut run_wave: F) -> Result<Vec<TaskRollout>>
where
    F: FnMut(std::ops::Range<usize>) -> Result<Vec<TaskRollout>>,
{
    let mut out = Vec::new();
    if n_updates == 0 {
        return Ok(out);
    }
    let wave_width = wave_width.max(1);
    let mut next_job = 0;
    let mut steps = 0;
    loop {
        let end = match batch_size {
            None => (next_job + wave_width).min(n_updates),
            Some(_) => next_job + wave_width,
        };
        let rollouts = run_wave(next_job..end)?;
        let wave_steps: usize = rollouts.iter().map(TaskRollout::env_steps).sum();
        steps += wave_steps;
        out.extend(rollouts);
        next_job = end;
        let done = match batch_size {
            None => next_job >= n_updates,
            // an empty wave would never make progress
            Some(budget) => steps >= budget || wave_steps == 0,
        };
        if done {
            return Ok(out);
        }
    }
}

/// Runs every job on the calling thread.
#[derive(Debug)]
pub struct LocalSampler {
    config: SamplerConfig,
}

impl LocalSampler {
    #[must_use]
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }
}

impl<E: Env> Sampler<E> for LocalSampler {
    fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn obtain_samples(
        &mut self,
        seed: u64,
        itr: u64,
        updates: &[EnvUpdate<E>],
        policy: &GaussianGruPolicy,
        batch_size: Option<usize>,
    ) -> Result<Vec<TaskRollout>> {
        let worker = worker_for(&self.config);
        let n = updates.len();
        collect_waves(n, 1, batch_size, |jobs| {
            jobs.map(|j| run_job(worker, &updates[j % n], policy, seed, itr, j))
                .collect()
        })
    }
}

/// Runs each wave of jobs on a dedicated rayon pool of `n_workers`
/// threads.
pub struct ParallelSampler {
    config: SamplerConfig,
    pool: ThreadPool,
}

impl ParallelSampler {
    /// # Errors
    ///
    /// Fails if the thread pool cannot be built.
    pub fn new(config: SamplerConfig) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.n_workers.max(1))
            .thread_name(|i| format!("rollout-{i}"))
            .build()
            .context("building rollout thread pool")?;
        tracing::debug!(n_workers = config.n_workers, "rollout pool ready");
        Ok(Self { config, pool })
    }
}

impl<E: Env> Sampler<E> for ParallelSampler {
    fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn obtain_samples(
        &mut self,
        seed: u64,
        itr: u64,
        updates: &[EnvUpdate<E>],
        policy: &GaussianGruPolicy,
        batch_size: Option<usize>,
    ) -> Result<Vec<TaskRollout>> {
        let worker = worker_for(&self.config);
        let n = updates.len();
        let width = if self.config.use_all_workers {
            self.config.n_workers
        } else {
            self.config.n_workers.min(n)
        };
        let pool = &self.pool;
        collect_waves(n, width, batch_size, |jobs| {
            pool.install(|| {
                jobs.into_par_iter()
                    .map(|j| run_job(worker, &updates[j % n], policy, seed, itr, j))
                    .collect()
            })
        })
    }
}

/// Builds the sampler selected by `config.kind`.
///
/// # Errors
///
/// Fails if a parallel sampler's thread pool cannot be built.
pub fn make_sampler<E: Env + 'static>(config: SamplerConfig) -> Result<Box<dyn Sampler<E>>> {
    Ok(match config.kind {
        SamplerKind::Local => Box::new(LocalSampler::new(config)),
        SamplerKind::Parallel => Box::new(ParallelSampler::new(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake(steps: usize) -> TaskRollout {
        let mut path = Path::default();
        path.rewards = vec![0.0; steps];
        TaskRollout {
            description: String::new(),
            paths: vec![path],
        }
    }

    #[test]
    fn one_job_per_update_without_budget() {
        let out = collect_waves(5, 2, None, |jobs| Ok(jobs.map(|_| fake(3)).collect())).unwrap();
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn waves_continue_until_budget() {
        let mut waves = 0;
        let out = collect_waves(2, 2, Some(10), |jobs| {
            waves += 1;
            Ok(jobs.map(|_| fake(3)).collect())
        })
        .unwrap();
        assert_eq!(waves, 2);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn empty_rollouts_do_not_loop_forever() {
        let out = collect_waves(1, 1, Some(10), |jobs| Ok(jobs.map(|_| fake(0)).collect())).unwrap();
        assert_eq!(out.len(), 1);
    }
}
