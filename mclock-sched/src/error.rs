//! Scheduler error types.

/// Scheduler error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedError {
    /// A client index did not resolve to a registered client with queued work.
    ///
    /// Unreachable through the public API; seeing it means the registry and
    /// the deadline cache disagree.
    #[error("client index {index} does not refer to a registered client with pending work")]
    UnknownClient {
        /// The index that failed to resolve.
        index: usize,
    },

    /// Dequeue was called with nothing pending.
    #[error("scheduler is empty")]
    Empty,

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;
