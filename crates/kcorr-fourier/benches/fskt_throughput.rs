use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use kcorr_core::synthetic::{ideal_gas, IdealGasSpec};
use kcorr_core::trajectory::Trajectory;
use kcorr_core::CancelToken;
use kcorr_fourier::{
    CollectiveScattering, CorrelationConfig, EngineKind, SelfScattering, ShellSpec,
    StructureFactor, TimeSpec,
};

fn trajectory() -> Arc<dyn Trajectory> {
    let spec = IdealGasSpec {
        particles: 256,
        frames: 64,
        side: 10.0,
        sigma: 0.1,
        timestep: 1.0,
        species: 1,
        seed: 42,
    };
    Arc::new(ideal_gas(&spec).expect("ideal gas"))
}

fn config(engine: EngineKind) -> CorrelationConfig {
    let mut config = CorrelationConfig::new(engine);
    config.shells = ShellSpec::with_radii(vec![2.0, 4.0, 6.0]);
    config.times = TimeSpec::with_times(vec![1.0, 4.0, 16.0, 32.0]);
    config
}

fn bench_correlations(c: &mut Criterion) {
    let trajectory = trajectory();
    let cancel = CancelToken::new();
    let mut group = c.benchmark_group("fskt_throughput");

    let fskt = SelfScattering::new(trajectory.clone(), &config(EngineKind::SelfScattering)).expect("fskt");
    group.bench_function("self_scattering", |b| {
        b.iter(|| fskt.compute(&cancel).expect("compute"))
    });

    let fkt = CollectiveScattering::new(trajectory.clone(), &config(EngineKind::Collective)).expect("fkt");
    group.bench_function("collective", |b| b.iter(|| fkt.compute(&cancel).expect("compute")));

    let sk = StructureFactor::new(trajectory, &config(EngineKind::StructureFactor), None).expect("sk");
    group.bench_function("structure_factor", |b| b.iter(|| sk.compute(&cancel).expect("compute")));
    group.finish();
}

criterion_group!(benches, bench_correlations);
criterion_main!(benches);
