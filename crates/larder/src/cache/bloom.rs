//! Anti-penetration guard for the read-through decorator.
//!
//! Repeated lookups for keys absent from both the cache and the system of
//! record would each fall through to the backing store. The guard consults
//! a probabilistic membership filter before the loader runs: a
//! definitely-absent verdict short-circuits with `NotFound` without
//! touching the system of record. Filter population is the owner's
//! concern; the guard only consumes the membership test.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::read_through::{Loader, ReadThroughCache};
use super::store::Cache;
use crate::error::{CacheError, CacheResult};

/// Membership test consumed by the penetration guard.
///
/// Infallible by contract — a filter is assumed always available. `false`
/// means definitely absent; `true` allows false positives.
pub trait MembershipFilter: Send + Sync {
    /// Whether `key` might exist in the system of record.
    fn contains(&self, key: &str) -> bool;
}

/// Loader wrapper that rejects definitely-absent keys before delegating.
struct GuardedLoader {
    filter: Arc<dyn MembershipFilter>,
    inner: Arc<dyn Loader>,
}

#[async_trait]
impl Loader for GuardedLoader {
    async fn load(&self, key: &str) -> CacheResult<Vec<u8>> {
        if !self.filter.contains(key) {
            return Err(CacheError::not_found(key));
        }
        self.inner.load(key).await
    }
}

/// Read-through cache whose loader is gated by a membership filter.
///
/// Every access mode of the underlying [`ReadThroughCache`] inherits the
/// guard, since the filter sits inside the loader itself.
pub struct BloomFilterCache {
    inner: ReadThroughCache,
}

impl BloomFilterCache {
    /// Wrap `cache` with a filter-guarded read-through loader.
    pub fn new(
        cache: Arc<dyn Cache>,
        filter: Arc<dyn MembershipFilter>,
        loader: Arc<dyn Loader>,
        ttl: Option<Duration>,
    ) -> Self {
        let guarded = Arc::new(GuardedLoader { filter, inner: loader });
        Self { inner: ReadThroughCache::new(cache, guarded, ttl) }
    }
}

impl std::ops::Deref for BloomFilterCache {
    type Target = ReadThroughCache;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[async_trait]
impl Cache for BloomFilterCache {
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        Cache::set(&self.inner, key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        Cache::delete(&self.inner, key).await
    }

    async fn exists(&self, key: &str) -> bool {
        Cache::exists(&self.inner, key).await
    }

    async fn load_and_delete(&self, key: &str) -> CacheResult<Vec<u8>> {
        Cache::load_and_delete(&self.inner, key).await
    }
}
