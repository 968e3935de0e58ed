//! Container-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during container operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerError {
    /// The [`ContainerConfig`](crate::ContainerConfig) failed validation.
    InvalidConfig {
        /// Description of the violated invariant.
        reason: String,
    },
    /// Growing would exceed the configured particle budget.
    CapacityExceeded {
        /// Particle count that was needed.
        requested: u64,
        /// Configured maximum capacity.
        max: u32,
    },
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid container config: {reason}"),
            Self::CapacityExceeded { requested, max } => {
                write!(
                    f,
                    "particle capacity exceeded: requested {requested}, max {max}"
                )
            }
        }
    }
}

impl Error for ContainerError {}
