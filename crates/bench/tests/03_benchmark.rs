use bench::{run_benchmark, BenchmarkConfig, EnvId, Hyperparameters, TaskSamplerKind};
use ml::logger::read_csv_columns;
use ml::sampler::SamplerKind;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn tiny_params(n_trials: usize) -> Hyperparameters {
    Hyperparameters {
        meta_batch_size: 2,
        hidden_sizes: vec![8],
        max_path_length: 5,
        n_itr: 2,
        steps_per_epoch: 1,
        rollout_per_task: 2,
        optimizer_max_epochs: 2,
        n_trials,
        n_test_tasks: 2,
        sampler: SamplerKind::Local,
        ..Hyperparameters::default()
    }
}

#[test]
fn tiny_benchmark_lays_out_trials_and_plots() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let config = BenchmarkConfig {
        root: root.path().to_path_buf(),
        envs: vec![EnvId::HalfCheetahDir],
        params: tiny_params(2),
        seed: Some(3),
        ..BenchmarkConfig::default()
    };
    let report = run_benchmark(&config).unwrap();

    // %Y-%m-%d-%H-%M-%S-%6f
    let stamp = report.dir.file_name().unwrap().to_str().unwrap();
    assert_eq!(stamp.len(), 26);
    assert_eq!(stamp.split('-').count(), 7);

    let env = &report.envs[0];
    assert_eq!(env.env_id, EnvId::HalfCheetahDir);
    assert_eq!(env.seeds.len(), 2);
    assert_ne!(env.seeds[0], env.seeds[1]);

    for (k, (seed, csv)) in env.seeds.iter().zip(&env.csvs).enumerate() {
        let trial_dir = report
            .dir
            .join("HalfCheetahDirEnv")
            .join(format!("trial_{}_seed_{seed}", k + 1))
            .join("strider");
        assert_eq!(csv, &trial_dir.join("progress.csv"));
        assert!(trial_dir.join("parameters.json").exists());
        assert!(trial_dir.join("debug.log").exists());

        let columns = read_csv_columns(csv, &["TotalEnvSteps", "MetaTest/AverageReturn"]).unwrap();
        // 2 tasks x 2 episodes x 5 steps per iteration, one row per epoch
        assert_eq!(columns["TotalEnvSteps"], vec![20.0, 40.0]);
        assert!(columns["MetaTest/AverageReturn"].iter().all(|v| v.is_finite()));
    }

    assert_eq!(env.plots.len(), 2);
    for plot in &env.plots {
        assert!(plot.starts_with(&report.dir));
        assert_eq!(image::image_dimensions(plot).unwrap(), (800, 500));
    }
    assert!(report
        .dir
        .join("HalfCheetahDirEnv_benchmark_MetaTest-AverageReturn.png")
        .exists());
}

#[test]
fn env_pool_sampler_trains_velocity_env() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let config = BenchmarkConfig {
        root: root.path().to_path_buf(),
        envs: vec![EnvId::HalfCheetahVel],
        params: tiny_params(1),
        task_sampler: TaskSamplerKind::EnvPool,
        seed: Some(11),
        ..BenchmarkConfig::default()
    };
    let report = run_benchmark(&config).unwrap();
    assert_eq!(report.envs[0].csvs.len(), 1);
    assert!(report.envs[0].csvs[0].exists());
}

#[test]
fn invalid_parameters_fail_before_any_output() {
    let root = tempfile::tempdir().unwrap();
    let config = BenchmarkConfig {
        root: root.path().join("never"),
        params: Hyperparameters {
            rollout_per_task: 0,
            ..tiny_params(1)
        },
        ..BenchmarkConfig::default()
    };
    assert!(run_benchmark(&config).is_err());
    assert!(!root.path().join("never").exists());
}

#[test]
#[ignore = "full-size benchmark, takes hours"]
fn full_benchmark_both_envs() {
    let root = tempfile::tempdir().unwrap();
    let config = BenchmarkConfig {
        root: root.path().to_path_buf(),
        envs: EnvId::ALL.to_vec(),
        seed: Some(0),
        ..BenchmarkConfig::default()
    };
    let report = run_benchmark(&config).unwrap();
    assert_eq!(report.envs.len(), 2);
}
