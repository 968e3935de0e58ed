//! Test utilities for Mote development.
//!
//! Provides a [`standard_schema`] with the fields most particle features
//! use, and a [`TestPopulation`] builder that produces containers with a
//! known live population so tests can assert on exact values.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::Arc;

use glam::{Quat, Vec3};
use mote_container::{ContainerConfig, ParticleContainer, SpawnEntry};
use mote_core::{BuiltinFields, FieldFlags, FieldHandle, IndexRange, Schema, SchemaBuilder};

/// Handles of the fields registered by [`standard_schema`].
#[derive(Clone, Copy, Debug)]
pub struct StandardFields {
    pub builtins: BuiltinFields,
    /// `f32 × 3`, with init shadow.
    pub position: FieldHandle<f32>,
    /// `f32 × 3`.
    pub velocity: FieldHandle<f32>,
    /// `f32`.
    pub size: FieldHandle<f32>,
    /// Packed RGBA `u32`, cleared when re-enabled.
    pub color: FieldHandle<u32>,
    /// `f32 × 4`, `x, y, z, w`.
    pub orientation: FieldHandle<f32>,
}

/// A sealed schema with built-ins, position, velocity, size, color and
/// orientation.
pub fn standard_schema() -> (Arc<Schema>, StandardFields) {
    let mut builder = SchemaBuilder::new();
    let position = builder
        .register::<f32>("position", 3, FieldFlags::INIT_SLOT)
        .expect("position");
    let velocity = builder
        .register::<f32>("velocity", 3, FieldFlags::empty())
        .expect("velocity");
    let size = builder
        .register::<f32>("size", 1, FieldFlags::empty())
        .expect("size");
    let color = builder
        .register::<u32>("color", 1, FieldFlags::CLEAR_ON_ENABLE)
        .expect("color");
    let orientation = builder
        .register::<f32>("orientation", 4, FieldFlags::empty())
        .expect("orientation");
    let fields = StandardFields {
        builtins: *builder.builtins(),
        position,
        velocity,
        size,
        color,
        orientation,
    };
    (builder.build(), fields)
}

/// Enable every field of [`standard_schema`].
pub fn enable_all(container: &mut ParticleContainer, fields: &StandardFields) {
    let b = fields.builtins;
    container.add_particle_data(b.parent_id);
    container.add_particle_data(b.spawn_id);
    container.add_particle_data(b.normal_age);
    container.add_particle_data(b.spawn_fraction);
    container.add_particle_data(fields.position);
    container.add_particle_data(fields.velocity);
    container.add_particle_data(fields.size);
    container.add_particle_data(fields.color);
    container.add_particle_data(fields.orientation);
}

/// Builder for containers holding a committed, deterministic population.
///
/// Particle `i` (by spawn id) gets `size = i`, `position = (i, 2i, 3i)`,
/// `velocity = (1, 0, 0)`, `color = i` and an identity orientation. Tests
/// can therefore recover a particle's identity from any enabled field
/// after compaction has reordered things.
pub struct TestPopulation {
    config: ContainerConfig,
    live: u32,
    enable_all: bool,
}

impl TestPopulation {
    pub fn new(live: u32) -> Self {
        Self {
            config: ContainerConfig::default(),
            live,
            enable_all: true,
        }
    }

    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Only enable the built-in fields.
    pub fn builtins_only(mut self) -> Self {
        self.enable_all = false;
        self
    }

    pub fn build(self) -> (ParticleContainer, StandardFields) {
        let (schema, fields) = standard_schema();
        let mut container = ParticleContainer::new(schema, self.config).expect("valid config");
        if self.enable_all {
            enable_all(&mut container, &fields);
        } else {
            let b = fields.builtins;
            container.add_particle_data(b.parent_id);
            container.add_particle_data(b.spawn_id);
            container.add_particle_data(b.normal_age);
            container.add_particle_data(b.spawn_fraction);
        }
        let staged = container
            .add_particles(&[SpawnEntry::new(self.live)])
            .expect("population fits");
        if self.enable_all {
            write_identity_values(&mut container, &fields, staged);
            container.init_from_current(fields.position, staged);
        }
        container.reset_spawned_particles();
        (container, fields)
    }
}

/// Write the [`TestPopulation`] value pattern over `range`, keyed by the
/// spawn id already stored there.
pub fn write_identity_values(
    container: &mut ParticleContainer,
    fields: &StandardFields,
    range: IndexRange,
) {
    let ids: Vec<u32> = {
        let ids = container.read_stream(fields.builtins.spawn_id, 0);
        range.iter().map(|i| ids.load(i)).collect()
    };
    let mut streams = container.streams();
    let mut size = streams.write(fields.size);
    let mut color = streams.write(fields.color);
    let mut position = streams.write_vec3(fields.position);
    let mut velocity = streams.write_vec3(fields.velocity);
    let mut orientation = streams.write_quat(fields.orientation);
    for (index, id) in range.iter().zip(ids) {
        let f = id as f32;
        size.store(index, f);
        color.store(index, id);
        position.store(index, Vec3::new(f, 2.0 * f, 3.0 * f));
        velocity.store(index, Vec3::X);
        orientation.store(index, Quat::IDENTITY);
    }
}

/// Spawn ids of the live particles, in index order.
pub fn live_spawn_ids(container: &ParticleContainer, fields: &StandardFields) -> Vec<u32> {
    let ids = container.read_stream(fields.builtins.spawn_id, u32::MAX);
    container.live_range().iter().map(|i| ids.load(i)).collect()
}
