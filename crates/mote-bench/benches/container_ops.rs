//! Criterion micro-benchmarks for spawn, compaction and stream access.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use mote_bench::{emitter_profile, kill_list};
use mote_container::SpawnEntry;
use mote_core::IndexRange;
use mote_test_utils::fixtures::random_kill_list;
use mote_test_utils::TestPopulation;
use wide::f32x4;

/// Benchmark: stage and commit 10K newborns into a 100K population.
fn bench_spawn_10k(c: &mut Criterion) {
    c.bench_function("spawn_commit_10k", |b| {
        b.iter_batched(
            || emitter_profile(100_000, 1).unwrap().0,
            |mut container| {
                let staged = container
                    .add_particles(&[SpawnEntry::new(10_000).with_age(0.0, 1e-5)])
                    .unwrap();
                container.reset_spawned_particles();
                black_box(staged);
                container
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: remove 10% of a 100K population.
fn bench_remove_10_percent(c: &mut Criterion) {
    let remove = kill_list(100_000, 0.1, 7);
    c.bench_function("remove_100k_10pct", |b| {
        b.iter_batched(
            || emitter_profile(100_000, 1).unwrap().0,
            |mut container| {
                container.remove_particles(black_box(&remove));
                container
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: remove 10% of a 100K population with every standard field
/// enabled, init shadows and orientation included.
fn bench_remove_all_fields(c: &mut Criterion) {
    let remove = random_kill_list(100_000, 0.1, 7);
    c.bench_function("remove_all_fields_100k_10pct", |b| {
        b.iter_batched(
            || TestPopulation::new(100_000).build().0,
            |mut container| {
                container.remove_particles(black_box(&remove));
                container
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: scalar position integration over 100K particles.
fn bench_integrate_scalar(c: &mut Criterion) {
    let (mut container, fields) = emitter_profile(100_000, 1).unwrap();
    let live = container.live_range();
    c.bench_function("integrate_scalar_100k", |b| {
        b.iter(|| {
            let mut streams = container.streams();
            let velocity = streams.read_vec3(fields.velocity, glam::Vec3::ZERO);
            let mut position = streams.write_vec3(fields.position);
            for i in live {
                let p = position.load(i) + velocity.load(i) * 0.016;
                position.store(i, p);
            }
        });
    });
}

/// Benchmark: lane-wide integration of one component over 100K particles.
fn bench_integrate_lanes(c: &mut Criterion) {
    let (mut container, fields) = emitter_profile(100_000, 1).unwrap();
    let groups = IndexRange::new(0, mote_core::align_up(container.live_count())).groups();
    let x = fields.position.component(0);
    let vx = fields.velocity.component(0);
    let dt = f32x4::splat(0.016);
    c.bench_function("integrate_lanes_100k", |b| {
        b.iter(|| {
            let mut streams = container.streams();
            let v = streams.read(vx, 0.0);
            let mut p = streams.write(x);
            for g in groups {
                p.store_lanes(g, p.load_lanes(g) + v.load_lanes(g) * dt);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_spawn_10k,
    bench_remove_10_percent,
    bench_remove_all_fields,
    bench_integrate_scalar,
    bench_integrate_lanes
);
criterion_main!(benches);
