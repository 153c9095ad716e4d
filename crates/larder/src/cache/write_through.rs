//! Write-through decorator: persist to the system of record before
//! caching.
//!
//! The synchronous mode writes to the store of record and only populates
//! the cache once persistence succeeded; a persist failure aborts the
//! whole operation with the cache untouched. The asynchronous mode still
//! persists synchronously but detaches the cache population, logging its
//! failure instead of surfacing it — the call already reported success
//! based on persistence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::store::Cache;
use crate::error::CacheResult;

/// The system-of-record write capability consumed before caching.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Persist `value` under `key` in the store of record.
    async fn store(&self, key: &str, value: &[u8]) -> CacheResult<()>;
}

/// Persist-before-cache decorator over any [`Cache`].
pub struct WriteThroughCache {
    cache: Arc<dyn Cache>,
    persister: Arc<dyn Persister>,
}

impl WriteThroughCache {
    /// Wrap `cache` so writes go through `persister` first.
    pub fn new(cache: Arc<dyn Cache>, persister: Arc<dyn Persister>) -> Self {
        Self { cache, persister }
    }

    /// Persist synchronously, then populate the cache from a detached
    /// task.
    ///
    /// A persist failure aborts and is returned; a population failure is
    /// logged, not surfaced.
    pub async fn set_async(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.persister.store(key, &value).await?;

        let cache = Arc::clone(&self.cache);
        let key_owned = key.to_owned();
        tokio::spawn(async move {
            if let Err(err) = cache.set(&key_owned, value, ttl).await {
                warn!(operation = "populate", key = %key_owned, error = %err, "write-through population failed");
            }
        });
        Ok(())
    }
}

#[async_trait]
impl Cache for WriteThroughCache {
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        self.cache.get(key).await
    }

    /// Synchronous write-through: persist first, cache only on success.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        self.persister.store(key, &value).await?;
        self.cache.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.cache.delete(key).await
    }

    async fn exists(&self, key: &str) -> bool {
        self.cache.exists(key).await
    }

    async fn load_and_delete(&self, key: &str) -> CacheResult<Vec<u8>> {
        self.cache.load_and_delete(key).await
    }
}
