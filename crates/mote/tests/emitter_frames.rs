//! Integration test: a complete emitter driven frame by frame.
//!
//! Uses every sub-crate together the way a particle system would: spawn
//! with chaos-driven initial values, age with lane-wide math, evaluate
//! curves for size and color, and compact dead particles. Runs twice from
//! the same seed and checks the results are identical.

use mote::math::CubeRootApprox;
use mote::prelude::*;
use wide::f32x4;

struct Emitter {
    particles: ParticleContainer,
    position: FieldHandle<f32>,
    velocity: FieldHandle<f32>,
    size: FieldHandle<f32>,
    tint: FieldHandle<f32>,
    age: FieldHandle<f32>,
    key: ChaosKey,
    size_curve: Spline,
    color_curve: ColorSpline,
}

impl Emitter {
    fn new(seed: u32) -> Self {
        let mut builder = SchemaBuilder::new();
        let position = builder.register::<f32>("position", 3, FieldFlags::INIT_SLOT).unwrap();
        let velocity = builder.register::<f32>("velocity", 3, FieldFlags::empty()).unwrap();
        let size = builder.register::<f32>("size", 1, FieldFlags::empty()).unwrap();
        let tint = builder.register::<f32>("tint", 3, FieldFlags::CLEAR_ON_ENABLE).unwrap();
        let b = *builder.builtins();
        let mut particles = ParticleContainer::new(builder.build(), ContainerConfig::new(64)).unwrap();
        for h in [b.normal_age, b.spawn_fraction, position, velocity, size, tint] {
            particles.add_particle_data(h);
        }
        particles.add_particle_data(b.spawn_id);

        let mut color_curve = ColorSpline::default();
        color_curve.rebuild_from(
            &[SourceKey::new(0.0, 1.0), SourceKey::new(1.0, 0.2)],
            &[SourceKey::new(0.0, 0.5)],
            &[SourceKey::new(0.0, 0.0), SourceKey::new(0.5, 1.0), SourceKey::new(1.0, 0.0)],
        );
        Self {
            particles,
            position,
            velocity,
            size,
            tint,
            age: b.normal_age,
            key: ChaosKey::new(seed),
            size_curve: Spline::from_keys(&[
                SourceKey::new(0.0, 0.1),
                SourceKey::with_tangents(0.3, 1.0, 0.0, 0.0),
                SourceKey::new(1.0, 0.0),
            ]),
            color_curve,
        }
    }

    fn frame(&mut self, spawn: u32, dt: f32) {
        let per = if spawn > 0 { dt / spawn as f32 } else { 0.0 };
        let staged = self
            .particles
            .add_particles(&[SpawnEntry::new(spawn).with_age(0.0, per)])
            .unwrap();
        let cbrt = CubeRootApprox::default();
        let speed = ChaosRange::new(1.0, 3.0);
        {
            let mut streams = self.particles.streams();
            let mut pos = streams.write_vec3(self.position);
            let mut vel = streams.write_vec3(self.velocity);
            for i in staged {
                pos.store(i, self.key.rand_ball(&cbrt));
                vel.store(i, self.key.rand_sphere() * self.key.rand_in(&speed));
            }
        }
        self.particles.init_from_current(self.position, staged);
        self.particles.reset_spawned_particles();

        let live = self.particles.live_range();
        let dt_lanes = f32x4::splat(dt);
        {
            let mut streams = self.particles.streams();
            let mut age = streams.write(self.age);
            let mut pos = streams.write_vec3(self.position);
            let vel = streams.read_vec3(self.velocity, Vec3::ZERO);
            let mut size = streams.write(self.size);
            let mut tint = streams.write_vec3(self.tint);
            for g in IndexRange::new(0, mote::types::align_up(live.end())).groups() {
                let a = age.load_lanes(g) + dt_lanes;
                age.store_lanes(g, a);
                size.store_lanes(g, self.size_curve.interpolate_lanes(a));
            }
            for i in live {
                pos.store(i, pos.load(i) + vel.load(i) * dt);
                tint.store(i, self.color_curve.interpolate(age.load(i)));
            }
        }

        let dead: Vec<ParticleId> = {
            let age = self.particles.read_stream(self.age, 0.0);
            live.iter().filter(|&i| age.load(i) >= 1.0).collect()
        };
        self.particles.remove_particles(&dead);
    }

    fn snapshot(&self) -> Vec<(u32, Vec3, f32)> {
        let b = *self.particles.schema().builtins();
        let ids = self.particles.read_stream(b.spawn_id, 0);
        let pos = self.particles.vec3_stream(self.position, Vec3::ZERO);
        let size = self.particles.read_stream(self.size, 0.0);
        let mut out: Vec<_> = self
            .particles
            .live_range()
            .iter()
            .map(|i| (ids.load(i), pos.load(i), size.load(i)))
            .collect();
        out.sort_by_key(|e| e.0);
        out
    }
}

#[test]
fn emitter_reaches_steady_state() {
    let mut e = Emitter::new(5);
    for _ in 0..40 {
        e.frame(20, 0.1);
    }
    // Lifetime is ten frames, so the population settles at ten batches.
    let live = e.particles.live_count();
    assert!((180..=200).contains(&live), "live = {live}");

    let (lo, hi) = e.size_curve.value_range();
    let size = e.particles.read_stream(e.size, f32::NAN);
    for i in e.particles.live_range() {
        let s = size.load(i);
        assert!(s >= lo - 1e-4 && s <= hi + 1e-4, "size {s} outside [{lo}, {hi}]");
    }
}

#[test]
fn same_seed_same_particles() {
    let mut a = Emitter::new(77);
    let mut b = Emitter::new(77);
    for frame in 0..25 {
        let spawn = 5 + frame % 7;
        a.frame(spawn, 0.07);
        b.frame(spawn, 0.07);
    }
    assert_eq!(a.snapshot(), b.snapshot());

    let mut c = Emitter::new(78);
    for frame in 0..25 {
        c.frame(5 + frame % 7, 0.07);
    }
    assert_ne!(a.snapshot(), c.snapshot());
}

#[test]
fn init_shadow_keeps_birth_position() {
    let mut e = Emitter::new(1);
    e.frame(8, 0.1);
    e.frame(0, 0.1);
    let init = e.particles.vec3_stream(e.position.init().unwrap(), Vec3::NAN);
    let pos = e.particles.vec3_stream(e.position, Vec3::NAN);
    let vel = e.particles.vec3_stream(e.velocity, Vec3::NAN);
    for i in e.particles.live_range() {
        let expected = init.load(i) + vel.load(i) * 0.2;
        assert!((pos.load(i) - expected).length() < 1e-5);
    }
}
