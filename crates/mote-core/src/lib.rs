//! Core types for the Mote particle data engine.
//!
//! This is the leaf crate with zero internal Mote dependencies. It defines
//! the fundamental types used throughout the workspace: particle and slot
//! identifiers, field element types and flags, the sealed [`Schema`]
//! registry, and the index/group range types that keep vectorized access
//! aligned to [`GROUP_STRIDE`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;
pub mod range;
pub mod schema;

/// Number of lanes processed by one vectorized operation.
pub const LANES: usize = 4;

/// Particle count of one SIMD group. Capacities and spawn starts are
/// multiples of this.
pub const GROUP_STRIDE: u32 = LANES as u32;

pub use error::SchemaError;
pub use field::{
    Element, ElementType, FieldDescriptor, FieldFlags, FieldHandle, FieldSet, FieldSetIter,
    FieldShape,
};
pub use id::{FieldIndex, GroupIndex, ParticleId, INVALID_PARTICLE};
pub use range::{align_down, align_up, GroupRange, IndexRange};
pub use schema::{BuiltinFields, Schema, SchemaBuilder, SlotInfo, MAX_DIMENSION};
