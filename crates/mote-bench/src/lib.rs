//! Benchmark profiles and utilities for the Mote particle data engine.
//!
//! Provides pre-built workloads for the criterion benches:
//!
//! - [`emitter_profile`]: a container with a typical emitter's fields and
//!   a committed population
//! - [`kill_list`]: a deterministic removal list at a given death rate
//! - [`size_over_life`]: a five-key curve shaped like an authored size
//!   curve

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use glam::Vec3;
use mote_container::{ContainerConfig, ContainerError, ParticleContainer, SpawnEntry};
use mote_core::{BuiltinFields, FieldFlags, FieldHandle, ParticleId, SchemaBuilder, SchemaError};
use mote_math::{ChaosKey, SourceKey, Spline};

/// Field handles of [`emitter_profile`].
#[derive(Clone, Copy, Debug)]
pub struct EmitterFields {
    /// Built-in fields.
    pub builtins: BuiltinFields,
    /// `f32 × 3` with init shadow.
    pub position: FieldHandle<f32>,
    /// `f32 × 3`.
    pub velocity: FieldHandle<f32>,
    /// `f32`.
    pub size: FieldHandle<f32>,
    /// `u32` packed color.
    pub color: FieldHandle<u32>,
}

/// Errors building a profile.
#[derive(Debug)]
pub enum ProfileError {
    /// Field registration failed.
    Schema(SchemaError),
    /// The population did not fit.
    Container(ContainerError),
}

impl From<SchemaError> for ProfileError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<ContainerError> for ProfileError {
    fn from(e: ContainerError) -> Self {
        Self::Container(e)
    }
}

/// Build a container with `live` committed particles.
///
/// Positions are scattered in a unit ball and velocities point outward,
/// both driven by `seed`.
pub fn emitter_profile(
    live: u32,
    seed: u32,
) -> Result<(ParticleContainer, EmitterFields), ProfileError> {
    let mut builder = SchemaBuilder::new();
    let fields = EmitterFields {
        builtins: *builder.builtins(),
        position: builder.register("position", 3, FieldFlags::INIT_SLOT)?,
        velocity: builder.register("velocity", 3, FieldFlags::empty())?,
        size: builder.register("size", 1, FieldFlags::empty())?,
        color: builder.register("color", 1, FieldFlags::CLEAR_ON_ENABLE)?,
    };
    let mut container = ParticleContainer::new(builder.build(), ContainerConfig::default())?;
    let b = fields.builtins;
    container.add_particle_data(b.parent_id);
    container.add_particle_data(b.spawn_id);
    container.add_particle_data(b.normal_age);
    container.add_particle_data(b.spawn_fraction);
    container.add_particle_data(fields.position);
    container.add_particle_data(fields.velocity);
    container.add_particle_data(fields.size);
    container.add_particle_data(fields.color);

    let step = if live > 1 { 1.0 / (live - 1) as f32 } else { 0.0 };
    let staged = container.add_particles(&[SpawnEntry::new(live).with_fraction(0.0, step)])?;
    let cbrt = mote_math::CubeRootApprox::default();
    let mut key = ChaosKey::new(seed);
    {
        let mut streams = container.streams();
        let mut position = streams.write_vec3(fields.position);
        let mut velocity = streams.write_vec3(fields.velocity);
        let mut size = streams.write(fields.size);
        for i in staged {
            let p = key.rand_ball(&cbrt);
            position.store(i, p);
            velocity.store(i, p.try_normalize().unwrap_or(Vec3::Y) * 2.0);
            size.store(i, 0.5 + key.rand_unorm());
        }
    }
    container.init_from_current(fields.position, staged);
    container.reset_spawned_particles();
    Ok((container, fields))
}

/// Ascending removal list over `[0, live)` with death probability `rate`.
pub fn kill_list(live: u32, rate: f32, seed: u32) -> Vec<ParticleId> {
    let mut key = ChaosKey::new(seed);
    (0..live).filter(|_| key.rand_unorm() < rate).collect()
}

/// Grow quickly, hold, then fade out.
pub fn size_over_life() -> Spline {
    Spline::from_keys(&[
        SourceKey::new(0.0, 0.0),
        SourceKey::with_tangents(0.1, 1.2, 2.0, 0.0),
        SourceKey::new(0.4, 1.0),
        SourceKey::new(0.8, 0.9),
        SourceKey::with_tangents(1.0, 0.0, -3.0, 0.0),
    ])
}
