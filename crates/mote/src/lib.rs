//! Mote: the particle data engine.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Mote sub-crates. For most users, adding `mote` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use mote::prelude::*;
//!
//! // Declare fields, then seal the schema.
//! let mut builder = SchemaBuilder::new();
//! let position = builder.register::<f32>("position", 3, FieldFlags::INIT_SLOT).unwrap();
//! let size = builder.register::<f32>("size", 1, FieldFlags::empty()).unwrap();
//! let builtins = *builder.builtins();
//! let schema = builder.build();
//!
//! let mut particles = ParticleContainer::new(schema, ContainerConfig::default()).unwrap();
//! particles.add_particle_data(builtins.normal_age);
//! particles.add_particle_data(position);
//! particles.add_particle_data(size);
//!
//! // Spawn 100 particles on the unit sphere.
//! let staged = particles.add_particles(&[SpawnEntry::new(100)]).unwrap();
//! let mut key = ChaosKey::new(42);
//! {
//!     let mut pos = particles.vec3_rw_stream(position);
//!     for i in staged {
//!         pos.store(i, key.rand_sphere());
//!     }
//! }
//! particles.init_from_current(position, staged);
//! particles.reset_spawned_particles();
//!
//! // Age everything and drive size from a curve.
//! let curve = Spline::linear(1.0, 0.0);
//! {
//!     let mut streams = particles.streams();
//!     let mut age = streams.write(builtins.normal_age);
//!     let mut sizes = streams.write(size);
//!     for i in 0..100 {
//!         let a = if i % 2 == 0 { 1.5 } else { 0.5 };
//!         age.store(i, a);
//!         sizes.store(i, curve.interpolate(a));
//!     }
//! }
//!
//! // Remove the particles past the end of their life.
//! let dead: Vec<u32> = {
//!     let age = particles.read_stream(builtins.normal_age, 0.0);
//!     particles.live_range().iter().filter(|&i| age.load(i) >= 1.0).collect()
//! };
//! particles.remove_particles(&dead);
//! assert_eq!(particles.live_count(), 50);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `mote-core` | IDs, ranges, field types, schema registry |
//! | [`math`] | `mote-math` | Chaos keys, cube-root approximation, splines |
//! | [`container`] | `mote-container` | Particle container and streams |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and the field registry (`mote-core`).
///
/// Contains particle and slot identifiers, [`types::IndexRange`] and
/// [`types::GroupRange`], field element types and the sealed
/// [`types::Schema`].
pub use mote_core as types;

/// Procedural math (`mote-math`).
///
/// The [`math::ChaosKey`] RNG and its lane-parallel twin, and the
/// [`math::Spline`] and [`math::ColorSpline`] curves.
pub use mote_math as math;

/// Particle storage (`mote-container`).
///
/// [`container::ParticleContainer`] and the typed stream views it lends.
pub use mote_container as container;

/// Vector math types used by the streams and samplers.
pub use glam;

/// Common imports for typical Mote usage.
///
/// ```rust
/// use mote::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use mote_core::{
        FieldFlags, FieldHandle, FieldIndex, GroupIndex, GroupRange, IndexRange, ParticleId,
        Schema, SchemaBuilder, GROUP_STRIDE, INVALID_PARTICLE, LANES,
    };

    // Math
    pub use mote_math::{ChaosKey, ChaosKeyLanes, ChaosRange, ColorSpline, SourceKey, Spline};

    // Container
    pub use mote_container::{
        ContainerConfig, ParticleContainer, ReadStream, ReadWriteStream, SpawnEntry,
    };

    // Errors
    pub use mote_container::ContainerError;
    pub use mote_core::SchemaError;

    // Vector types
    pub use glam::{Quat, Vec3};
}
