use criterion::{criterion_group, criterion_main, Criterion};
use ml::policy::GaussianGruPolicy;
use ml::sampler::{LocalSampler, ParallelSampler, Sampler, SamplerConfig, SamplerKind};
use ml::{Env, HalfCheetahDirEnv, Rl2Env, SetTaskSampler, TaskSampler};

fn bench_rollouts(c: &mut Criterion) {
    let mut tasks = SetTaskSampler::new(|| Rl2Env::new(HalfCheetahDirEnv::new()));
    tasks.seed(0);
    let updates = tasks.sample(8);
    let policy = GaussianGruPolicy::new(updates[0].make_env().spec(), 64, 1.0, 0);
    let config = |kind| SamplerConfig {
        kind,
        n_workers: 8,
        use_all_workers: false,
        n_paths_per_trial: 2,
        max_path_length: 150,
    };

    let mut local = LocalSampler::new(config(SamplerKind::Local));
    c.bench_function("rl2_rollouts_local", |b| {
        b.iter(|| local.obtain_samples(0, 0, &updates, &policy, None).unwrap());
    });

    let mut parallel = ParallelSampler::new(config(SamplerKind::Parallel)).unwrap();
    c.bench_function("rl2_rollouts_parallel", |b| {
        b.iter(|| parallel.obtain_samples(0, 0, &updates, &policy, None).unwrap());
    });
}

criterion_group!(benches, bench_rollouts);
criterion_main!(benches);
