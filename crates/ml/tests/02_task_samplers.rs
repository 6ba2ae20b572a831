use ml::{
    DirectionTask, Env, EnvPoolSampler, HalfCheetahDirEnv, HalfCheetahVelEnv, Rl2Env, SetTaskSampler, TaskEnv,
    TaskSampler,
};

#[test]
fn set_task_sampler_builds_configured_envs() {
    let mut sampler = SetTaskSampler::new(HalfCheetahDirEnv::new);
    sampler.seed(3);
    let updates = sampler.sample(16);
    assert_eq!(updates.len(), 16);
    assert_eq!(sampler.n_tasks(), None);
    for update in &updates {
        let env = update.make_env();
        assert_eq!(update.description(), format!("{:?}", env.task()));
    }
}

#[test]
fn set_task_sampler_is_reproducible_per_seed() {
    let describe = |seed| {
        let mut sampler = SetTaskSampler::new(HalfCheetahVelEnv::new);
        sampler.seed(seed);
        sampler
            .sample(8)
            .iter()
            .map(|u| u.description().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(describe(1), describe(1));
    assert_ne!(describe(1), describe(2));
}

#[test]
fn pool_grows_cyclically_and_enumerates_in_order() {
    let envs = vec![
        HalfCheetahDirEnv::with_task(DirectionTask::FORWARD),
        HalfCheetahDirEnv::with_task(DirectionTask::BACKWARD),
    ];
    let mut pool = EnvPoolSampler::new(envs, 0).unwrap();
    pool.grow_pool(5);
    pool.grow_pool(3);
    assert_eq!(pool.n_tasks(), Some(5));

    let tasks: Vec<DirectionTask> = pool.sample(5).iter().map(|u| *u.make_env().task()).collect();
    assert_eq!(
        tasks,
        vec![
            DirectionTask::FORWARD,
            DirectionTask::BACKWARD,
            DirectionTask::FORWARD,
            DirectionTask::BACKWARD,
            DirectionTask::FORWARD,
        ]
    );
    assert_eq!(pool.sample(3).len(), 3);
    assert_eq!(pool.sample(9).len(), 9);
}

#[test]
fn empty_pool_is_rejected() {
    assert!(EnvPoolSampler::<HalfCheetahDirEnv>::new(Vec::new(), 0).is_err());
}

#[test]
fn rl2_wrapper_forwards_tasks() {
    let mut sampler = SetTaskSampler::new(|| Rl2Env::new(HalfCheetahDirEnv::new()));
    sampler.seed(4);
    let mut env = sampler.sample(1)[0].make_env();
    let task = *env.task();
    assert_eq!(*env.inner().task(), task);
    env.set_task(&DirectionTask::BACKWARD);
    assert_eq!(*env.inner().task(), DirectionTask::BACKWARD);
    assert_eq!(env.spec().observation_dim, 17 + 6 + 2);
}
