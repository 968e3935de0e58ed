//! Structure-of-arrays particle storage for Mote.
//!
//! A [`ParticleContainer`] owns one buffer per enabled schema slot and
//! keeps every buffer the same length, so particle `i` lives at index `i`
//! of each of them. Features access particle data through typed streams
//! borrowed from the container.
//!
//! # Architecture
//!
//! ```text
//! ParticleContainer
//! ├── Arc<Schema> (slot layout, shared by every container of the emitter type)
//! ├── FieldSet (enabled slots)
//! ├── FieldBuffer × slot_count (Vec<u64>-backed, zero-initialized, optional)
//! └── counters: live, spawn_begin, spawn_end, capacity, next_spawn_id
//! ```
//!
//! # Lifecycle of a frame
//!
//! 1. [`ParticleContainer::add_particles`] stages newborns on a group
//!    boundary and writes the built-in fields.
//! 2. Init features write the staged range through streams.
//! 3. [`ParticleContainer::reset_spawned_particles`] folds them into the
//!    live range.
//! 4. Update features run over [`ParticleContainer::live_range`], possibly
//!    in parallel over disjoint group ranges.
//! 5. [`ParticleContainer::remove_particles`] compacts the dead away.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod buffer;
mod compaction;
pub mod config;
pub mod container;
pub mod error;
pub mod stream;

pub use compaction::ParticleRemap;
pub use config::ContainerConfig;
pub use container::{ParticleContainer, SpawnEntry};
pub use error::ContainerError;
pub use stream::{
    QuatRwStream, QuatStream, ReadStream, ReadWriteStream, StreamAccess, Vec3RwStream, Vec3Stream,
};
