use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fluid2d::{BoundaryKind, ComputeBackend, CpuBackend, FieldKind, FluidSim, Kernel, SimulationParameters};

fn seeded_sim(size: usize) -> FluidSim<CpuBackend> {
    let params = SimulationParameters::new(size, 1e-4, 1e-7);
    let mut sim = FluidSim::new(CpuBackend::new(size), params).unwrap();
    sim.inject(FieldKind::ADensity, 0.5, 0.5, 5.0, 0.1).unwrap();
    sim.inject(FieldKind::UVelocity, 0.5, 0.5, 10.0, 0.05).unwrap();
    sim
}

fn benchmark_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_step");
    group.sample_size(20);

    // Different grid sizes
    for size in [64, 128, 256].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut sim = seeded_sim(size);
            b.iter(|| {
                black_box(sim.step(0.016).unwrap().total(0));
            });
        });
    }
    group.finish();
}

fn benchmark_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernels");
    let mut backend = CpuBackend::new(256);
    let grid = backend.grid();

    let mut src = backend.allocate("src").unwrap();
    for (i, v) in src.iter_mut().enumerate() {
        *v = (i % 17) as f32 * 0.01;
    }
    let vel = src.clone();
    let mut dest = backend.allocate("dest").unwrap();
    let a = 0.016 * 1e-4 * (grid.sim_size * grid.sim_size) as f32;

    group.bench_function("diffuse_sweep", |b| {
        b.iter(|| {
            backend
                .dispatch(Kernel::DiffuseSweep {
                    dest: &mut dest,
                    src: &src,
                    a,
                    denominator: 1.0 / (1.0 + 4.0 * a),
                })
                .unwrap();
        });
    });

    group.bench_function("advect", |b| {
        b.iter(|| {
            backend
                .dispatch(Kernel::Advect {
                    dest: &mut dest,
                    src: &src,
                    vel: &vel,
                    dt0: 0.016 * grid.sim_size as f32,
                })
                .unwrap();
        });
    });

    group.bench_function("project_pressure_sweep", |b| {
        b.iter(|| {
            backend
                .dispatch(Kernel::ProjectPressure { tmp: &mut src })
                .unwrap();
        });
    });

    group.bench_function("set_boundary", |b| {
        b.iter(|| {
            backend
                .dispatch(Kernel::SetBoundary {
                    dest: &mut dest,
                    kind: BoundaryKind::Velocity,
                })
                .unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_step, benchmark_kernels);
criterion_main!(benches);
