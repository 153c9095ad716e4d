//! Error types for the distributed lock.

use thiserror::Error;

/// Standard result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors returned by [`LockClient`](crate::lock::LockClient) and
/// [`Lock`](crate::lock::Lock).
///
/// Release and refresh failures are always surfaced — swallowing them
/// would mask an exclusivity violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The lock is held by someone else, or the retry budget ran out.
    #[error("lock acquisition failed: already held")]
    Failed,

    /// Release found no lock owned by this token: it was never held, it
    /// expired, or another holder re-acquired it.
    #[error("unlock failed: lock not held by this token")]
    NotHeld,

    /// Refresh found no lease owned by this token; the caller must stop
    /// treating the resource as exclusively owned.
    #[error("lease refresh failed: lock lost")]
    RefreshFailed,

    /// The caller's cancellation token fired before acquisition.
    #[error("lock operation cancelled by caller")]
    Cancelled,

    /// Any other failure from the remote store.
    #[error("backend error: {message}")]
    Backend {
        /// Human-readable description of the underlying failure.
        message: String,
    },
}

impl LockError {
    /// Create a `Backend` error with the given message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }
}

impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        Self::backend(err.to_string())
    }
}
