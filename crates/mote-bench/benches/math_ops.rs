//! Criterion micro-benchmarks for chaos sampling and spline evaluation.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use mote_bench::size_over_life;
use mote_math::{ChaosKey, ChaosKeyLanes, CubeRootApprox};
use wide::f32x4;

const SAMPLES: usize = 10_000;

/// Benchmark: 10K scalar unit floats.
fn bench_chaos_unorm(c: &mut Criterion) {
    c.bench_function("chaos_unorm_10k", |b| {
        let mut key = ChaosKey::new(42);
        b.iter(|| {
            let mut acc = 0.0f32;
            for _ in 0..SAMPLES {
                acc += key.rand_unorm();
            }
            black_box(acc)
        });
    });
}

/// Benchmark: 10K unit floats four lanes at a time.
fn bench_chaos_unorm_lanes(c: &mut Criterion) {
    c.bench_function("chaos_unorm_lanes_10k", |b| {
        let mut lanes = ChaosKeyLanes::from_key(&mut ChaosKey::new(42));
        b.iter(|| {
            let mut acc = f32x4::ZERO;
            for _ in 0..SAMPLES / 4 {
                acc = acc + lanes.rand_unorm();
            }
            black_box(acc)
        });
    });
}

/// Benchmark: 10K points in the unit ball.
fn bench_chaos_ball(c: &mut Criterion) {
    let cbrt = CubeRootApprox::default();
    c.bench_function("chaos_ball_10k", |b| {
        let mut key = ChaosKey::new(7);
        b.iter(|| {
            let mut acc = glam::Vec3::ZERO;
            for _ in 0..SAMPLES {
                acc += key.rand_ball(&cbrt);
            }
            black_box(acc)
        });
    });
}

/// Benchmark: scalar vs lane evaluation of a five-key curve.
fn bench_spline(c: &mut Criterion) {
    let spline = size_over_life();
    let times: Vec<f32> = (0..SAMPLES).map(|i| i as f32 / SAMPLES as f32).collect();

    c.bench_function("spline_scalar_10k", |b| {
        b.iter(|| {
            let mut acc = 0.0f32;
            for &t in &times {
                acc += spline.interpolate(t);
            }
            black_box(acc)
        });
    });

    c.bench_function("spline_lanes_10k", |b| {
        b.iter(|| {
            let mut acc = f32x4::ZERO;
            for chunk in times.chunks_exact(4) {
                let t = f32x4::new([chunk[0], chunk[1], chunk[2], chunk[3]]);
                acc = acc + spline.interpolate_lanes(t);
            }
            black_box(acc)
        });
    });
}

criterion_group!(
    benches,
    bench_chaos_unorm,
    bench_chaos_unorm_lanes,
    bench_chaos_ball,
    bench_spline
);
criterion_main!(benches);
