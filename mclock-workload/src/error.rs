//! Workload error types.

use mclock_sched::SchedError;

/// Workload error type.
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    /// The scheduler rejected an operation.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedError),

    /// The profile cannot be run.
    #[error("invalid profile: {message}")]
    InvalidProfile {
        /// Error message.
        message: String,
    },

    /// A wait-time histogram could not be created.
    #[error("histogram error: {message}")]
    Histogram {
        /// Error message.
        message: String,
    },
}

/// Result type for workload operations.
pub type WorkloadResult<T> = Result<T, WorkloadError>;
