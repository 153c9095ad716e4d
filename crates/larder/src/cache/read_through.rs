//! Read-through decorator: load-on-miss from the system of record.
//!
//! Wraps any [`Cache`] plus a [`Loader`]. A miss (and only a miss — any
//! other backend error is propagated untouched) triggers a load, and the
//! loaded value is written back into the cache with the decorator's
//! default ttl. Four access modes trade consistency against latency:
//!
//! - [`get`](ReadThroughCache::get): load and populate before returning.
//!   Population is best-effort; its failure is logged and the loaded value
//!   is still returned.
//! - [`get_async`](ReadThroughCache::get_async): return the miss
//!   immediately and warm the cache from a detached task.
//! - [`get_async_partial`](ReadThroughCache::get_async_partial): load
//!   synchronously, populate from a detached task.
//! - [`get_deduplicated`](ReadThroughCache::get_deduplicated): like `get`,
//!   but concurrent misses for one key share a single load.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::singleflight::FlightGroup;
use super::store::Cache;
use crate::error::{CacheError, CacheResult};

/// The system-of-record read capability consumed on a cache miss.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Fetch the value for `key` from the system of record.
    async fn load(&self, key: &str) -> CacheResult<Vec<u8>>;
}

/// Load-on-miss decorator over any [`Cache`].
pub struct ReadThroughCache {
    cache: Arc<dyn Cache>,
    loader: Arc<dyn Loader>,
    ttl: Option<Duration>,
    flights: FlightGroup,
}

impl ReadThroughCache {
    /// Wrap `cache` so misses load through `loader`; freshly loaded values
    /// are cached with `ttl`.
    pub fn new(cache: Arc<dyn Cache>, loader: Arc<dyn Loader>, ttl: Option<Duration>) -> Self {
        Self { cache, loader, ttl, flights: FlightGroup::new() }
    }

    /// Synchronous read-through.
    ///
    /// On a miss the loader runs and the value is written back before this
    /// returns. A population failure is logged and swallowed; the loaded
    /// value is still handed to the caller.
    pub async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        match self.cache.get(key).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_not_found() => {
                let value = self.loader.load(key).await?;
                if let Err(err) = self.cache.set(key, value.clone(), self.ttl).await {
                    warn!(operation = "populate", key, error = %err, "read-through population failed");
                }
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }

    /// Fire-and-forget read-through.
    ///
    /// A miss is returned to the caller immediately while a detached task
    /// loads and populates, so the next request finds a warm cache. Load
    /// and population failures are logged, never surfaced.
    pub async fn get_async(&self, key: &str) -> CacheResult<Vec<u8>> {
        match self.cache.get(key).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_not_found() => {
                let cache = Arc::clone(&self.cache);
                let loader = Arc::clone(&self.loader);
                let ttl = self.ttl;
                let key_owned = key.to_owned();
                tokio::spawn(async move {
                    match loader.load(&key_owned).await {
                        Ok(value) => {
                            if let Err(err) = cache.set(&key_owned, value, ttl).await {
                                warn!(operation = "populate", key = %key_owned, error = %err, "read-through population failed");
                            }
                        }
                        Err(err) => {
                            warn!(operation = "load", key = %key_owned, error = %err, "read-through load failed");
                        }
                    }
                });
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Partially asynchronous read-through.
    ///
    /// On a miss the loader runs synchronously and its value is returned,
    /// but the population happens in a detached task; caller latency
    /// excludes the write-back.
    pub async fn get_async_partial(&self, key: &str) -> CacheResult<Vec<u8>> {
        match self.cache.get(key).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_not_found() => {
                let value = self.loader.load(key).await?;
                let cache = Arc::clone(&self.cache);
                let ttl = self.ttl;
                let key_owned = key.to_owned();
                let populate = value.clone();
                tokio::spawn(async move {
                    if let Err(err) = cache.set(&key_owned, populate, ttl).await {
                        warn!(operation = "populate", key = %key_owned, error = %err, "read-through population failed");
                    }
                });
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }

    /// De-duplicated read-through.
    ///
    /// Behaves like [`get`](Self::get), except that all concurrent callers
    /// missing on the same key share one loader invocation and observe the
    /// same result, value or error.
    pub async fn get_deduplicated(&self, key: &str) -> CacheResult<Vec<u8>> {
        match self.cache.get(key).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_not_found() => {
                self.flights
                    .run(key, || async {
                        let value = self.loader.load(key).await?;
                        if let Err(err) = self.cache.set(key, value.clone(), self.ttl).await {
                            warn!(operation = "populate", key, error = %err, "read-through population failed");
                        }
                        Ok(value)
                    })
                    .await
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl Cache for ReadThroughCache {
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        ReadThroughCache::get(self, key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
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
