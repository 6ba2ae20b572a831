use criterion::{criterion_group, criterion_main, Criterion};
use physics::{HalfCheetah, HalfCheetahConfig};

fn bench_half_cheetah_step(c: &mut Criterion) {
    let mut sim = HalfCheetah::new(HalfCheetahConfig::default());
    let ctrl = [0.5, -0.5, 0.2, -0.2, 0.3, -0.3];
    c.bench_function("half_cheetah_env_step", |b| {
        b.iter(|| sim.do_simulation(&ctrl, 5).unwrap());
    });
}

criterion_group!(benches, bench_half_cheetah_step);
criterion_main!(benches);
