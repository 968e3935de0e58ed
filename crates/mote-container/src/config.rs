//! Container configuration parameters.

use mote_core::{align_up, GROUP_STRIDE};

use crate::error::ContainerError;

/// Configuration for one particle container.
///
/// Validated when the container is created; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Capacity allocated for every enabled field at creation.
    ///
    /// Rounded up to a multiple of [`GROUP_STRIDE`]. `0` defers all
    /// allocation to the first spawn.
    pub initial_capacity: u32,

    /// Hard particle budget. Growth past it fails with
    /// [`ContainerError::CapacityExceeded`].
    ///
    /// Default: [`ContainerConfig::DEFAULT_MAX_CAPACITY`]. Must be a
    /// non-zero multiple of [`GROUP_STRIDE`].
    pub max_capacity: u32,
}

impl ContainerConfig {
    /// Default particle budget: 16M particles.
    pub const DEFAULT_MAX_CAPACITY: u32 = 1 << 24;

    /// Create a config with the given initial capacity and the default
    /// budget.
    pub fn new(initial_capacity: u32) -> Self {
        Self {
            initial_capacity,
            max_capacity: Self::DEFAULT_MAX_CAPACITY,
        }
    }

    /// Replace the particle budget.
    pub fn with_max_capacity(mut self, max_capacity: u32) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// The initial capacity after stride alignment.
    pub fn aligned_initial_capacity(&self) -> u32 {
        align_up(self.initial_capacity)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ContainerError> {
        if self.max_capacity == 0 || self.max_capacity % GROUP_STRIDE != 0 {
            return Err(ContainerError::InvalidConfig {
                reason: format!(
                    "max_capacity must be a non-zero multiple of {GROUP_STRIDE}, got {}",
                    self.max_capacity
                ),
            });
        }
        if self.initial_capacity > self.max_capacity {
            return Err(ContainerError::InvalidConfig {
                reason: format!(
                    "initial_capacity ({}) exceeds max_capacity ({})",
                    self.initial_capacity, self.max_capacity
                ),
            });
        }
        Ok(())
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
