//! Procedural math for Mote particle features.
//!
//! Two independent services used while initializing and updating
//! particles:
//!
//! - [`chaos`]: the [`ChaosKey`] deterministic RNG, scalar and
//!   [`ChaosKeyLanes`] lane-parallel, with unit-float, ranged and
//!   geometric samplers.
//! - [`spline`]: cubic [`Spline`] curves with an exact cached value range,
//!   scalar and lane evaluation, and an RGB [`ColorSpline`].
//!
//! Both are plain values: a key is owned by whoever advances it and a
//! spline is only read (`&self`) during simulation, so neither needs
//! synchronization.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cbrt;
pub mod chaos;
pub mod spline;

pub use cbrt::CubeRootApprox;
pub use chaos::{
    ball_point, circle_point, disc_point, sphere_point, ChaosKey, ChaosKeyLanes, ChaosRange,
};
pub use spline::{ColorSpline, SourceKey, Spline, SplineKey};

// Lane width of the vector types used here must match the container's
// group stride so a group can be fed straight into a lane sampler.
const _: () = assert!(mote_core::LANES == 4);
