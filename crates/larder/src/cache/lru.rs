//! LRU-bounded expiring store.
//!
//! [`LruCache`] keeps at most `capacity` entries and evicts the
//! least-recently-used one automatically when a new key would overflow —
//! the production bounded-store policy, as opposed to
//! [`LocalCache`](crate::cache::LocalCache)'s refuse-when-full bound.
//! Entries still carry optional deadlines, checked lazily on read; every
//! `get` mutates recency order, so the whole store sits behind one mutex.

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::entry::Entry;
use super::local::EvictionCallback;
use super::store::Cache;
use crate::collections::LruList;
use crate::error::{CacheError, CacheResult};

/// Capacity-bounded store with least-recently-used eviction.
pub struct LruCache {
    inner: Mutex<LruList<String, Entry>>,
    capacity: NonZeroUsize,
    on_eviction: Option<EvictionCallback>,
}

impl LruCache {
    /// Create a store bounded to `capacity` entries.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { inner: Mutex::new(LruList::new()), capacity, on_eviction: None }
    }

    /// Observe every entry removed from the store, including automatic
    /// evictions.
    #[must_use]
    pub fn with_on_eviction(mut self, callback: EvictionCallback) -> Self {
        self.on_eviction = Some(callback);
        self
    }

    /// Maximum number of entries held without evicting.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of entries currently held, including not-yet-expired-checked
    /// ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify_eviction(&self, key: &str, value: &[u8]) {
        if let Some(callback) = &self.on_eviction {
            callback(key, value);
        }
    }
}

#[async_trait]
impl Cache for LruCache {
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        let now = Instant::now();
        let owned = key.to_owned();

        let mut list = self.inner.lock();
        let expired = match list.get(&owned) {
            None => return Err(CacheError::not_found(key)),
            Some(entry) => entry.is_expired(now),
        };
        if expired {
            let removed = list.pop(&owned);
            drop(list);
            if let Some(entry) = removed {
                self.notify_eviction(key, &entry.value);
            }
            return Err(CacheError::not_found(key));
        }
        // The hit above already promoted the entry.
        list.peek(&owned)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::not_found(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let now = Instant::now();
        let entry = Entry::new(value, ttl, now);

        let mut list = self.inner.lock();
        list.put(key.to_owned(), entry);
        let evicted = if list.len() > self.capacity.get() { list.pop_lru() } else { None };
        drop(list);

        if let Some((key, entry)) = evicted {
            self.notify_eviction(&key, &entry.value);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let removed = self.inner.lock().pop(&key.to_owned());
        if let Some(entry) = removed {
            self.notify_eviction(key, &entry.value);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner.lock().peek(&key.to_owned()).is_some_and(|entry| !entry.is_expired(now))
    }

    async fn load_and_delete(&self, key: &str) -> CacheResult<Vec<u8>> {
        let now = Instant::now();
        let removed = self.inner.lock().pop(&key.to_owned());
        match removed {
            None => Err(CacheError::not_found(key)),
            Some(entry) => {
                self.notify_eviction(key, &entry.value);
                if entry.is_expired(now) {
                    Err(CacheError::not_found(key))
                } else {
                    Ok(entry.value)
                }
            }
        }
    }
}
