//! The capability contract every cache implementation satisfies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// The uniform contract over local stores, remote stores, and decorators.
///
/// Decorators hold an `Arc<dyn Cache>` and forward or augment calls, so any
/// backing store can sit behind any decorator chain. Values are opaque byte
/// strings; `ttl: None` means the entry never expires.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up the value for `key`.
    ///
    /// An absent or expired entry fails with
    /// [`CacheError::NotFound`](crate::CacheError::NotFound); any other
    /// failure means the store could not answer and must not be treated as
    /// a miss.
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>>;

    /// Store `value` under `key`, overwriting any existing entry and its
    /// deadline.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

    /// Remove the entry for `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Whether a live entry for `key` is present.
    ///
    /// Infallible by contract: a store that cannot answer reports the key
    /// as absent.
    async fn exists(&self, key: &str) -> bool;

    /// Atomically read and remove the entry for `key`, so a consumer can
    /// claim a value exactly once.
    async fn load_and_delete(&self, key: &str) -> CacheResult<Vec<u8>>;
}

#[async_trait]
impl<C: Cache + ?Sized> Cache for Arc<C> {
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &str) -> bool {
        (**self).exists(key).await
    }

    async fn load_and_delete(&self, key: &str) -> CacheResult<Vec<u8>> {
        (**self).load_and_delete(key).await
    }
}
