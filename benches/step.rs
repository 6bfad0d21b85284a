//! Benchmarks for extraction and the per-frame CPU path.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Vec3};

use vpe::extract::extract;
use vpe::mesh::{MeshSource, SkeletonId};
use vpe::particle_set::ParticleSet;
use vpe::simulation::{FrameInput, SimulationParams};
use vpe::{EngineConfig, Palette, ParticleEngine};

/// Sphere with roughly `samples` vertices.
fn sphere(samples: usize) -> MeshSource {
    let side = (samples as f32 / 2.0).sqrt().ceil() as u32;
    MeshSource::uv_sphere(1.0, side, side * 2)
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for samples in [10_000, 50_000] {
        let source = sphere(samples);
        group.bench_with_input(BenchmarkId::new("stride_1", samples), &source, |b, source| {
            b.iter(|| black_box(extract(source, 1)))
        });
        group.bench_with_input(BenchmarkId::new("stride_4", samples), &source, |b, source| {
            b.iter(|| black_box(extract(source, 4)))
        });
    }

    group.finish();
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    let params = SimulationParams::default().with_repulsion(0.5, 1.0);

    for samples in [10_000, 50_000] {
        let source = sphere(samples);

        group.bench_function(BenchmarkId::new("pointer_far", samples), |b| {
            let mut set = ParticleSet::from_source(&source, 1);
            let frame = FrameInput::without_pointer(1.0 / 60.0, 1.0);
            b.iter(|| set.step(black_box(&frame), &params, Mat4::IDENTITY))
        });

        group.bench_function(BenchmarkId::new("pointer_on_surface", samples), |b| {
            let mut set = ParticleSet::from_source(&source, 1);
            let frame = FrameInput::new(1.0 / 60.0, 1.0, Vec3::new(0.0, 0.0, 1.0));
            b.iter(|| set.step(black_box(&frame), &params, Mat4::IDENTITY))
        });
    }

    group.finish();
}

fn bench_engine_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_update");

    let source = sphere(50_000);
    group.bench_function("static_gradient", |b| {
        let config = EngineConfig::new().with_gradient(Palette::Viridis.gradient(1), 2.0);
        let mut engine = ParticleEngine::from_source(&source, config).unwrap();
        let frame = FrameInput::new(1.0 / 60.0, 1.0, Vec3::Z);
        b.iter(|| engine.update(black_box(&frame), Some(&source)))
    });

    let mut column = MeshSource::skinned_column(2.0, 0.25, 200, 64, 8);
    if let Some(skeleton) = column.skeleton_mut(SkeletonId(0)) {
        skeleton.set_local(3, Mat4::from_rotation_z(0.3));
        skeleton.update_world_matrices();
    }
    group.bench_function("skinned", |b| {
        let mut engine = ParticleEngine::from_source(&column, EngineConfig::default()).unwrap();
        let frame = FrameInput::without_pointer(1.0 / 60.0, 1.0);
        b.iter(|| engine.update(black_box(&frame), Some(&column)))
    });

    group.finish();
}

criterion_group!(benches, bench_extract, bench_step, bench_engine_update);
criterion_main!(benches);
