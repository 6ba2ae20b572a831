//! # Strider Application Logic
//!
//! Command-line surface of the `strider` binary. [`run`] dispatches one of
//! three subcommands:
//!
//! -   `bench` trains seeded RL² trials and plots their learning curves.
//! -   `sample-tasks` prints tasks drawn from an environment as JSON.
//! -   `rollout` steps a single task with random or zero actions and reports
//!     the return, which is handy for checking the simulator and reward terms
//!     without training anything.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bench::{run_benchmark, BenchmarkConfig, EnvId, Hyperparameters, TaskSamplerKind};
use clap::{Parser, Subcommand, ValueEnum};
use ml::sampler::SamplerKind;
use ml::{HalfCheetahDirEnv, HalfCheetahVelEnv, TaskEnv};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Parser, Debug)]
#[command(name = "strider", version, about = "RL² benchmarks on the half-cheetah task family")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train seeded RL² trials and plot their learning curves.
    Bench(BenchArgs),
    /// Print tasks sampled from an environment as JSON.
    SampleTasks {
        #[arg(long, default_value = "half-cheetah-dir")]
        env: EnvId,
        #[arg(short = 'n', long, default_value_t = 10)]
        num_tasks: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Roll out one sampled task without training.
    Rollout {
        #[arg(long, default_value = "half-cheetah-dir")]
        env: EnvId,
        #[arg(long, default_value_t = 150)]
        steps: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Apply zero torques instead of uniform random actions.
        #[arg(long)]
        zero: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SamplerArg {
    Local,
    Parallel,
}

impl From<SamplerArg> for SamplerKind {
    fn from(arg: SamplerArg) -> Self {
        match arg {
            SamplerArg::Local => SamplerKind::Local,
            SamplerArg::Parallel => SamplerKind::Parallel,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct BenchArgs {
    /// Environment to benchmark; repeat for several. Defaults to both.
    #[arg(long = "env")]
    pub envs: Vec<EnvId>,
    /// Number of seeded trials per environment.
    #[arg(long)]
    pub trials: Option<usize>,
    /// Training epochs per trial.
    #[arg(long)]
    pub n_itr: Option<usize>,
    /// JSON file with hyperparameters; missing keys keep their defaults.
    #[arg(long)]
    pub params: Option<PathBuf>,
    #[arg(long, default_value = "data/local/benchmarks/rl2")]
    pub output_dir: PathBuf,
    /// Reference run to plot alongside, as `ENV=path/to/progress.csv`.
    #[arg(long = "reference", value_parser = parse_reference)]
    pub references: Vec<(EnvId, PathBuf)>,
    #[arg(long, value_enum)]
    pub sampler: Option<SamplerArg>,
    #[arg(long, default_value = "set-task")]
    pub task_sampler: TaskSamplerKind,
    /// Seed for drawing trial seeds; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
}

fn parse_reference(s: &str) -> Result<(EnvId, PathBuf), String> {
    let (env, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ENV=PATH, got {s:?}"))?;
    let env = env.parse::<EnvId>().map_err(|e| e.to_string())?;
    Ok((env, PathBuf::from(path)))
}

/// Executes the parsed command line.
///
/// # Errors
///
/// Returns any error from loading parameters, training, plotting or writing
/// output.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Bench(args) => bench(args),
        Command::SampleTasks { env, num_tasks, seed } => {
            let tasks = env.sample_tasks_json(num_tasks, seed)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
            Ok(())
        }
        Command::Rollout { env, steps, seed, zero } => {
            let total = match env {
                EnvId::HalfCheetahDir => rollout(HalfCheetahDirEnv::new(), steps, seed, zero)?,
                EnvId::HalfCheetahVel => rollout(HalfCheetahVelEnv::new(), steps, seed, zero)?,
            };
            println!("{env}: return {total:.3} over {steps} steps");
            Ok(())
        }
    }
}

fn bench(args: BenchArgs) -> Result<()> {
    let mut params = match &args.params {
        Some(path) => Hyperparameters::load_json(path)?,
        None => Hyperparameters::default(),
    };
    if let Some(trials) = args.trials {
        params.n_trials = trials;
    }
    if let Some(n_itr) = args.n_itr {
        params.n_itr = n_itr;
    }
    if let Some(sampler) = args.sampler {
        params.sampler = sampler.into();
    }

    let mut reference_csvs: BTreeMap<EnvId, Vec<PathBuf>> = BTreeMap::new();
    for (env, path) in args.references {
        reference_csvs.entry(env).or_default().push(path);
    }

    let config = BenchmarkConfig {
        root: args.output_dir,
        envs: if args.envs.is_empty() {
            EnvId::ALL.to_vec()
        } else {
            args.envs
        },
        params,
        task_sampler: args.task_sampler,
        reference_csvs,
        seed: args.seed,
    };
    let report = run_benchmark(&config).context("benchmark failed")?;
    for env in &report.envs {
        tracing::info!(env = %env.env_id, seeds = ?env.seeds, plots = env.plots.len(), "environment done");
    }
    println!("{}", report.dir.display());
    Ok(())
}

fn rollout<E: TaskEnv>(mut env: E, steps: usize, seed: u64, zero: bool) -> Result<f32> {
    env.seed(seed);
    let task = env
        .sample_tasks(1)
        .pop()
        .context("environment sampled no task")?;
    tracing::info!(?task, "rolling out");
    env.set_task(&task);
    env.reset()?;

    let action_dim = env.spec().action_dim;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut total = 0.0;
    let mut info_sums: BTreeMap<String, f32> = BTreeMap::new();
    for _ in 0..steps {
        let action: Vec<f32> = if zero {
            vec![0.0; action_dim]
        } else {
            (0..action_dim).map(|_| rng.gen_range(-1.0..=1.0)).collect()
        };
        let step = env.step(&action)?;
        total += step.reward;
        for (key, value) in step.info {
            *info_sums.entry(key).or_default() += value;
        }
        if step.done {
            break;
        }
    }
    env.close();
    for (key, sum) in &info_sums {
        tracing::info!(key = %key, sum, "info total");
    }
    Ok(total)
}
