//! Error types shared by every cache implementation.
//!
//! The taxonomy is deliberately small: `NotFound` is the recoverable miss
//! signal that drives load-on-miss decorators, while everything else is a
//! hard failure surfaced to the caller. Backend errors are never collapsed
//! into `NotFound` — a store that cannot answer is not the same as a store
//! that answered "absent".

use thiserror::Error;

/// Standard result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors returned by [`Cache`](crate::cache::Cache) implementations and
/// their decorators.
///
/// The enum is `Clone` so that a single in-flight load can hand the same
/// failure to every de-duplicated waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The key is absent, or its entry expired.
    #[error("key not found: {key}")]
    NotFound {
        /// The key that missed.
        key: String,
    },

    /// A bounded store refused a brand-new key because it is full.
    #[error("store over capacity ({capacity} entries)")]
    OverCapacity {
        /// The configured maximum entry count.
        capacity: usize,
    },

    /// The store was closed twice.
    #[error("store is already closed")]
    AlreadyClosed,

    /// Any other failure from a backing store or loader.
    #[error("backend error: {message}")]
    Backend {
        /// Human-readable description of the underlying failure.
        message: String,
    },
}

impl CacheError {
    /// Create a `NotFound` error for the given key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a `Backend` error with the given message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }

    /// Whether this error is the recoverable miss signal.
    ///
    /// Decorators use this to distinguish "load from the system of record"
    /// from failures that must be propagated untouched.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
