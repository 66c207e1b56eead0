//! Scheduler configuration.

use crate::error::{SchedError, SchedResult};

/// Configuration for an [`MClockScheduler`](crate::MClockScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Shared capacity in units per second. Converts reserve and limit rates
    /// into virtual-clock spacings. Must be positive.
    pub system_throughput: u64,

    /// Number of clients to preallocate registry space for.
    pub client_capacity: usize,
}

impl SchedulerConfig {
    /// Creates a configuration with the given system throughput.
    #[must_use]
    pub const fn new(system_throughput: u64) -> Self {
        Self {
            system_throughput,
            client_capacity: 16,
        }
    }

    /// Sets the registry preallocation hint.
    #[must_use]
    pub const fn with_client_capacity(mut self, client_capacity: usize) -> Self {
        self.client_capacity = client_capacity;
        self
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            system_throughput: 1_000,
            client_capacity: 4,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::InvalidConfig` if the system throughput is zero.
    pub fn validate(&self) -> SchedResult<()> {
        if self.system_throughput == 0 {
            return Err(SchedError::InvalidConfig {
                message: "system_throughput must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            system_throughput: 10_000,
            client_capacity: 64,
        }
    }
}
