use ml::policy::GaussianGruPolicy;
use ml::sampler::{LocalSampler, ParallelSampler, Sampler, SamplerConfig, SamplerKind, TaskRollout};
use ml::{Env, EnvUpdate, HalfCheetahDirEnv, Rl2Env, SetTaskSampler, TaskSampler};

type MetaEnv = Rl2Env<HalfCheetahDirEnv>;

fn config(kind: SamplerKind, use_all_workers: bool) -> SamplerConfig {
    SamplerConfig {
        kind,
        n_workers: 2,
        use_all_workers,
        n_paths_per_trial: 2,
        max_path_length: 5,
    }
}

fn setup(n_tasks: usize) -> (Vec<EnvUpdate<MetaEnv>>, GaussianGruPolicy) {
    let mut tasks = SetTaskSampler::new(|| Rl2Env::new(HalfCheetahDirEnv::new()));
    tasks.seed(0);
    let updates = tasks.sample(n_tasks);
    let spec = updates[0].make_env().spec();
    (updates, GaussianGruPolicy::new(spec, 8, 1.0, 0))
}

fn rewards(rollouts: &[TaskRollout]) -> Vec<Vec<f32>> {
    rollouts
        .iter()
        .flat_map(|r| r.paths.iter().map(|p| p.rewards.clone()))
        .collect()
}

#[test]
fn trials_hold_consecutive_bounded_episodes() {
    let (updates, policy) = setup(3);
    let mut sampler = LocalSampler::new(config(SamplerKind::Local, false));
    let rollouts = sampler.obtain_samples(1, 0, &updates, &policy, None).unwrap();
    assert_eq!(rollouts.len(), 3);
    for (rollout, update) in rollouts.iter().zip(&updates) {
        assert_eq!(rollout.description, update.description());
        assert_eq!(rollout.paths.len(), 2);
        assert!(rollout.paths.iter().all(|p| p.len() == 5));
        assert_eq!(rollout.env_steps(), 10);
        let obs_dim = rollout.paths[0].observations[0].len();
        assert_eq!(obs_dim, 25);
    }
}

#[test]
fn hidden_state_carries_across_episodes_of_a_trial() {
    let (updates, policy) = setup(1);
    let mut sampler = LocalSampler::new(config(SamplerKind::Local, false));
    let rollouts = sampler.obtain_samples(3, 0, &updates, &policy, None).unwrap();
    let paths = &rollouts[0].paths;

    // the trial starts from the initial state
    let first = policy.dist_info(&mut policy.initial_state(), &paths[0].observations[0]);
    assert_eq!(paths[0].agent_infos[0], first);

    // the second episode continues from where the first one left off
    let fresh = policy.dist_info(&mut policy.initial_state(), &paths[1].observations[0]);
    assert_ne!(paths[1].agent_infos[0].mean, fresh.mean);

    let mut state = policy.initial_state();
    for obs in &paths[0].observations {
        policy.dist_info(&mut state, obs);
    }
    let carried = policy.dist_info(&mut state, &paths[1].observations[0]);
    assert_eq!(paths[1].agent_infos[0], carried);
}

#[test]
fn local_and_parallel_agree_job_by_job() {
    let (updates, policy) = setup(4);
    let mut local = LocalSampler::new(config(SamplerKind::Local, false));
    let mut parallel = ParallelSampler::new(config(SamplerKind::Parallel, false)).unwrap();
    let a = local.obtain_samples(7, 3, &updates, &policy, None).unwrap();
    let b = parallel.obtain_samples(7, 3, &updates, &policy, None).unwrap();
    assert_eq!(rewards(&a), rewards(&b));
}

#[test]
fn jobs_cycle_over_tasks_until_the_budget_is_met() {
    let (updates, policy) = setup(2);
    let mut local = LocalSampler::new(config(SamplerKind::Local, true));
    let rollouts = local.obtain_samples(0, 0, &updates, &policy, Some(30)).unwrap();
    assert_eq!(rollouts.len(), 3);
    assert_eq!(rollouts[2].description, updates[0].description());

    // a parallel wave is always n_workers jobs wide when every worker is used
    let mut parallel = ParallelSampler::new(config(SamplerKind::Parallel, true)).unwrap();
    let rollouts = parallel.obtain_samples(0, 0, &updates, &policy, Some(30)).unwrap();
    assert_eq!(rollouts.len(), 4);
}

#[test]
fn different_iterations_draw_different_rollouts() {
    let (updates, policy) = setup(1);
    let mut local = LocalSampler::new(config(SamplerKind::Local, false));
    let a = local.obtain_samples(0, 0, &updates, &policy, None).unwrap();
    let b = local.obtain_samples(0, 1, &updates, &policy, None).unwrap();
    assert_ne!(rewards(&a), rewards(&b));
}
