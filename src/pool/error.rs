//! Error types for the async submission facade.

use std::fmt;
use std::time::Duration;

/// Errors that can surface from [`execute`](super::ThreadPool::execute)
/// and friends.
///
/// The callback-based [`schedule`](super::ThreadPool::schedule) path
/// never returns errors; rejection is delivered to the task itself as
/// [`TaskOutcome::ShutdownInProgress`](crate::types::TaskOutcome).
#[derive(Debug, Clone)]
pub enum PoolError {
    /// The pool was shutting down when the work was submitted.
    Shutdown,

    /// The round trip did not complete before the deadline. The work
    /// itself still runs; only its result is discarded.
    Timeout(Duration),

    /// The completion channel was closed unexpectedly.
    ChannelClosed,
}

impl PoolError {
    /// Check if this is a shutdown rejection.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, PoolError::Shutdown)
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout(_))
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Shutdown => {
                write!(f, "pool is shutting down")
            }
            PoolError::Timeout(duration) => {
                write!(f, "work timed out after {:?}", duration)
            }
            PoolError::ChannelClosed => {
                write!(f, "completion channel closed unexpectedly")
            }
        }
    }
}

impl std::error::Error for PoolError {}

/// Result type alias for the async facade.
pub type PoolResult<T> = Result<T, PoolError>;
