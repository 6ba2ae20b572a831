//! One seeded training run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ml::algos::{Ppo, PpoConfig, Rl2, Rl2Config};
use ml::deterministic::derive_seed;
use ml::logger::{CsvOutput, Logger, StdOutput, TensorBoardOutput, TextOutput};
use ml::meta_evaluator::{MetaEvaluator, MetaEvaluatorConfig};
use ml::policy::GaussianGruPolicy;
use ml::runner::LocalRunner;
use ml::sampler::SamplerConfig;
use ml::{EnvPoolSampler, SetTaskSampler, TaskEnv, TaskSampler};

use crate::envs::{make_dir_env, make_vel_env, EnvId, TaskSamplerKind};
use crate::hyperparameters::Hyperparameters;

const TRAIN_TASKS: u64 = 0;
const TEST_TASKS: u64 = 1;
const INIT_STD: f32 = 1.0;

fn build_task_sampler<E>(
    kind: TaskSamplerKind,
    make_env: fn() -> E,
    seed: u64,
    params: &Hyperparameters,
) -> Result<Box<dyn TaskSampler<E>>>
where
    E: TaskEnv + Clone + Sync + 'static,
{
    Ok(match kind {
        TaskSamplerKind::SetTask => {
            let mut sampler = SetTaskSampler::new(make_env);
            sampler.seed(seed);
            Box::new(sampler)
        }
        TaskSamplerKind::EnvPool => {
            let mut proto = make_env();
            proto.seed(seed);
            let envs = proto
                .sample_tasks(params.n_test_tasks.max(1))
                .iter()
                .map(|task| {
                    let mut env = make_env();
                    env.set_task(task);
                    env
                })
                .collect();
            let mut pool = EnvPoolSampler::new(envs, seed)?;
            pool.grow_pool(params.meta_batch_size);
            Box::new(pool)
        }
    })
}

fn build_logger(log_dir: &Path) -> Result<(Logger, PathBuf)> {
    let csv = log_dir.join("progress.csv");
    let mut logger = Logger::new();
    logger.add_output(TextOutput::new(log_dir.join("debug.log"))?);
    logger.add_output(CsvOutput::new(&csv)?);
    logger.add_output(StdOutput::new());
    logger.add_output(TensorBoardOutput::new(log_dir)?);
    Ok((logger, csv))
}

fn train<E>(
    make_env: fn() -> E,
    kind: TaskSamplerKind,
    seed: u64,
    log_dir: &Path,
    params: &Hyperparameters,
) -> Result<PathBuf>
where
    E: TaskEnv + Clone + Sync + 'static,
{
    let mut spec_env = make_env();
    let spec = spec_env.spec();
    spec_env.close();

    let policy = GaussianGruPolicy::new(spec, params.hidden_dim(), INIT_STD, seed);
    let ppo = Ppo::new(
        PpoConfig {
            discount: params.discount,
            gae_lambda: params.gae_lambda,
            lr_clip_range: params.lr_clip_range,
            learning_rate: params.optimizer_lr,
            max_epochs: params.optimizer_max_epochs,
            minibatch_size: None,
            center_adv: params.normalize_adv,
            positive_adv: params.positive_adv,
        },
        &policy,
    );
    let algo = Rl2::new(
        Rl2Config {
            meta_batch_size: params.meta_batch_size,
            max_path_length: params.max_path_length,
            episodes_per_task: params.rollout_per_task,
            steps_per_epoch: params.steps_per_epoch,
            discount: params.discount,
        },
        policy,
        ppo,
        build_task_sampler(kind, make_env, derive_seed(seed, &[TRAIN_TASKS]), params)?,
        seed,
    );

    let sampler_config = SamplerConfig {
        kind: params.sampler,
        n_workers: params.meta_batch_size,
        use_all_workers: params.use_all_workers,
        n_paths_per_trial: params.rollout_per_task,
        max_path_length: params.max_path_length,
    };
    let evaluator = MetaEvaluator::new(
        MetaEvaluatorConfig {
            n_test_tasks: params.n_test_tasks,
            n_exploration_traj: params.rollout_per_task,
            n_test_rollouts: 1,
            max_path_length: params.max_path_length,
            discount: params.discount,
            ..MetaEvaluatorConfig::default()
        },
        build_task_sampler(kind, make_env, derive_seed(seed, &[TEST_TASKS]), params)?,
        sampler_config.clone(),
    )?;

    let (logger, csv) = build_logger(log_dir)?;
    let mut runner = LocalRunner::new(seed, logger);
    runner.setup(algo, sampler_config)?;
    runner.setup_meta_evaluator(evaluator);
    let result = runner.train(params.n_itr, params.batch_size());
    // outputs are torn down even when training failed
    runner.finish()?;
    let last_return = result?;
    tracing::info!(seed, last_return, csv = %csv.display(), "trial finished");
    Ok(csv)
}

/// Trains RL² on `env_id` with `seed`, logging into `log_dir`, and returns
/// the path of the trial's `progress.csv`.
///
/// # Errors
///
/// Propagates any failure from environment construction, training or file
/// output.
pub fn run_trial(
    env_id: EnvId,
    seed: u64,
    log_dir: &Path,
    params: &Hyperparameters,
    task_sampler: TaskSamplerKind,
) -> Result<PathBuf> {
    params.validate()?;
    fs::create_dir_all(log_dir).with_context(|| format!("creating {}", log_dir.display()))?;
    tracing::info!(env = %env_id, seed, log_dir = %log_dir.display(), "starting trial");
    match env_id {
        EnvId::HalfCheetahDir => train(make_dir_env, task_sampler, seed, log_dir, params),
        EnvId::HalfCheetahVel => train(make_vel_env, task_sampler, seed, log_dir, params),
    }
}
