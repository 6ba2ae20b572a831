//! Multi-trial benchmark driver.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use chrono::Local;
use ml::deterministic::derive_seed;
use ml::Env;
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::envs::{EnvId, TaskSamplerKind};
use crate::hyperparameters::Hyperparameters;
use crate::plot::{relplot, Series};
use crate::trial::run_trial;

/// Seeds are drawn without replacement from `0..SEED_RANGE`.
const SEED_RANGE: usize = 100;
const X_METRIC: &str = "TotalEnvSteps";

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Parent of the timestamped benchmark directory.
    pub root: PathBuf,
    pub envs: Vec<EnvId>,
    pub params: Hyperparameters,
    pub task_sampler: TaskSamplerKind,
    /// Optional reference runs plotted next to each environment's trials.
    pub reference_csvs: BTreeMap<EnvId, Vec<PathBuf>>,
    /// Seeds the trial-seed draw; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/local/benchmarks/rl2"),
            envs: vec![EnvId::HalfCheetahDir],
            params: Hyperparameters::default(),
            task_sampler: TaskSamplerKind::SetTask,
            reference_csvs: BTreeMap::new(),
            seed: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnvReport {
    pub env_id: EnvId,
    pub seeds: Vec<u64>,
    pub csvs: Vec<PathBuf>,
    pub plots: Vec<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct BenchmarkReport {
    pub dir: PathBuf,
    pub envs: Vec<EnvReport>,
}

/// Seed of one environment's trial-seed draw, so environments sharing a
/// benchmark seed still get independent trial seeds.
fn env_seed(seed: Option<u64>, env_id: EnvId) -> Option<u64> {
    seed.map(|s| derive_seed(s, &[env_id as u64]))
}

fn draw_seeds(n_trials: usize, seed: Option<u64>) -> Result<Vec<u64>> {
    ensure!(
        n_trials <= SEED_RANGE,
        "at most {SEED_RANGE} trials can have distinct seeds, got {n_trials}"
    );
    let mut rng = seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
    Ok(index::sample(&mut rng, SEED_RANGE, n_trials)
        .into_iter()
        .map(|s| s as u64)
        .collect())
}

/// Runs `body` on `env` and closes the environment afterwards, whether or
/// not `body` succeeded.
fn with_env<T>(env: &mut dyn Env, body: impl FnOnce(&mut dyn Env) -> Result<T>) -> Result<T> {
    let out = body(&mut *env);
    env.close();
    out
}

fn run_env_trials(
    env: &mut dyn Env,
    env_id: EnvId,
    seeds: &[u64],
    task_dir: &Path,
    config: &BenchmarkConfig,
) -> Result<Vec<PathBuf>> {
    let mut csvs = Vec::with_capacity(seeds.len());
    for (trial, &seed) in seeds.iter().enumerate() {
        let log_dir = task_dir.join(format!("trial_{}_seed_{seed}", trial + 1)).join("strider");
        env.seed(seed);
        env.reset().with_context(|| format!("resetting {env_id} before trial {}", trial + 1))?;
        csvs.push(run_trial(env_id, seed, &log_dir, &config.params, config.task_sampler)?);
        config.params.write_json(log_dir.join("parameters.json"))?;
    }
    Ok(csvs)
}

/// Runs `n_trials` trainings per environment under a fresh timestamped
/// directory, records the hyperparameters, and renders one plot per
/// tracked metric.
///
/// # Errors
///
/// Stops at the first failing trial, file write or plot.
pub fn run_benchmark(config: &BenchmarkConfig) -> Result<BenchmarkReport> {
    config.params.validate()?;
    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S-%6f").to_string();
    let dir = config.root.join(timestamp);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    tracing::info!(dir = %dir.display(), "benchmark started");

    let mut reports = Vec::with_capacity(config.envs.len());
    for &env_id in &config.envs {
        let seeds = draw_seeds(config.params.n_trials, env_seed(config.seed, env_id))?;
        let task_dir = dir.join(env_id.name());

        let mut env = env_id.make_env();
        let csvs = with_env(env.as_mut(), |env| run_env_trials(env, env_id, &seeds, &task_dir, config))?;
        tracing::debug!(env = %env_id, "environment closed");

        let references = config.reference_csvs.get(&env_id);
        let mut plots = Vec::new();
        for metric in env_id.tracked_metrics() {
            let plot_file = dir.join(format!("{}_benchmark_{}.png", env_id.name(), metric.replace('/', "-")));
            let run = Series::new("strider", csvs.clone(), X_METRIC, metric);
            let reference = references
                .filter(|r| !r.is_empty())
                .map(|r| Series::new("reference", r.clone(), X_METRIC, metric));
            relplot(env_id.name(), &run, reference.as_ref(), &plot_file)?;
            plots.push(plot_file);
        }
        reports.push(EnvReport {
            env_id,
            seeds,
            csvs,
            plots,
        });
    }
    tracing::info!(dir = %dir.display(), "benchmark finished");
    Ok(BenchmarkReport { dir, envs: reports })
}
