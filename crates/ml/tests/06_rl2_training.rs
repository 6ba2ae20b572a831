use ml::algos::{Ppo, PpoConfig, Rl2, Rl2Config};
use ml::logger::{read_csv_columns, CsvOutput, Logger};
use ml::meta_evaluator::{MetaEvaluator, MetaEvaluatorConfig};
use ml::policy::GaussianGruPolicy;
use ml::runner::LocalRunner;
use ml::sampler::{SamplerConfig, SamplerKind};
use ml::{Env, HalfCheetahDirEnv, Rl2Env, SetTaskSampler};

type MetaEnv = Rl2Env<HalfCheetahDirEnv>;

fn task_sampler(seed: u64) -> SetTaskSampler<MetaEnv> {
    let mut sampler = SetTaskSampler::new(|| Rl2Env::new(HalfCheetahDirEnv::new()));
    sampler.seed(seed);
    sampler
}

fn runner(seed: u64, rl2: Rl2Config, kind: SamplerKind, logger: Logger) -> LocalRunner<MetaEnv> {
    let spec = Rl2Env::new(HalfCheetahDirEnv::new()).spec();
    let policy = GaussianGruPolicy::new(spec, 16, 1.0, seed);
    let ppo = Ppo::new(
        PpoConfig {
            discount: rl2.discount,
            ..PpoConfig::default()
        },
        &policy,
    );
    let sampler_config = SamplerConfig {
        kind,
        n_workers: rl2.meta_batch_size,
        use_all_workers: true,
        n_paths_per_trial: rl2.episodes_per_task,
        max_path_length: rl2.max_path_length,
    };
    let evaluator = MetaEvaluator::new(
        MetaEvaluatorConfig {
            n_test_tasks: 2,
            n_exploration_traj: 1,
            n_test_rollouts: 1,
            max_path_length: rl2.max_path_length,
            ..MetaEvaluatorConfig::default()
        },
        Box::new(task_sampler(seed + 1)),
        sampler_config.clone(),
    )
    .unwrap();
    let algo = Rl2::new(rl2, policy, ppo, Box::new(task_sampler(seed)), seed);

    let mut runner = LocalRunner::new(seed, logger);
    runner.setup(algo, sampler_config).unwrap();
    runner.setup_meta_evaluator(evaluator);
    runner
}

#[test]
fn train_requires_setup() {
    let mut runner: LocalRunner<MetaEnv> = LocalRunner::new(0, Logger::new());
    assert!(runner.train(1, 10).is_err());
}

#[test]
fn small_run_writes_one_row_per_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("progress.csv");
    let mut logger = Logger::new();
    logger.add_output(CsvOutput::new(&csv).unwrap());

    let rl2 = Rl2Config {
        meta_batch_size: 2,
        max_path_length: 10,
        episodes_per_task: 2,
        steps_per_epoch: 2,
        discount: 0.99,
    };
    let batch_size = rl2.meta_batch_size * rl2.episodes_per_task * rl2.max_path_length;
    let mut runner = runner(0, rl2, SamplerKind::Local, logger);
    let last = runner.train(2, batch_size).unwrap();
    runner.finish().unwrap();

    assert!(last.is_finite());
    assert_eq!(runner.itr(), 4);
    assert_eq!(runner.total_env_steps(), 160);

    let cols = read_csv_columns(
        &csv,
        &["Itr", "Epoch", "TotalEnvSteps", "Evaluation/AverageReturn", "MetaTest/AverageReturn", "Policy/KL"],
    )
    .unwrap();
    assert_eq!(cols["Epoch"], vec![0.0, 1.0]);
    assert_eq!(cols["Itr"], vec![2.0, 4.0]);
    assert_eq!(cols["TotalEnvSteps"], vec![80.0, 160.0]);
    assert!(cols["Evaluation/AverageReturn"].iter().all(|v| v.is_finite()));
    assert!(cols["MetaTest/AverageReturn"].iter().all(|v| v.is_finite()));
}

#[test]
fn parallel_and_local_runs_match() {
    let rl2 = Rl2Config {
        meta_batch_size: 2,
        max_path_length: 8,
        episodes_per_task: 2,
        steps_per_epoch: 1,
        discount: 0.99,
    };
    let batch_size = rl2.meta_batch_size * rl2.episodes_per_task * rl2.max_path_length;
    let mut local = runner(5, rl2.clone(), SamplerKind::Local, Logger::new());
    let mut parallel = runner(5, rl2, SamplerKind::Parallel, Logger::new());
    assert_eq!(local.train(2, batch_size).unwrap(), parallel.train(2, batch_size).unwrap());
}

/// Full-size meta-training on the directional task. Slow.
#[test]
#[ignore]
fn rl2_improves_directional_return() {
    let rl2 = Rl2Config {
        meta_batch_size: 10,
        max_path_length: 100,
        episodes_per_task: 4,
        steps_per_epoch: 5,
        discount: 0.99,
    };
    let batch_size = rl2.meta_batch_size * rl2.episodes_per_task * rl2.max_path_length;
    let mut runner = runner(0, rl2, SamplerKind::Parallel, Logger::new());
    let first = runner.train(1, batch_size).unwrap();
    let last = runner.train(20, batch_size).unwrap();
    assert!(last > first, "return went from {first} to {last}");
}
