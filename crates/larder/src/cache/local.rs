//! In-process expiring store.
//!
//! [`LocalCache`] is a thread-safe key/value map with per-entry absolute
//! deadlines. Expired entries are dropped lazily on read and eagerly by a
//! background sweep task that runs for the life of the store. An optional
//! eviction callback observes every entry that leaves the store, and an
//! optional capacity bound turns inserts of brand-new keys into
//! [`CacheError::OverCapacity`] once the store is full.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use larder::cache::{Cache, LocalCache};
//!
//! # async fn demo() -> larder::CacheResult<()> {
//! let cache = LocalCache::new(Duration::from_secs(1));
//! cache.set("session", b"data".to_vec(), Some(Duration::from_secs(30))).await?;
//! let value = cache.get("session").await?;
//! # Ok(())
//! # }
//! ```
//!
//! The sweep task stops when [`LocalCache::close`] is called or when the
//! store is dropped; it must be constructed inside a Tokio runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::Instant;

use super::entry::Entry;
use super::store::Cache;
use crate::error::{CacheError, CacheResult};

/// Maximum number of entries a single sweep tick inspects.
///
/// Bounds the time spent under the write lock per wake-up; entries left
/// unexamined are picked up by a later tick.
const SWEEP_BATCH: usize = 1000;

/// Callback invoked with the key and value of every entry removed from a
/// store, whether by deletion, expiry, or capacity eviction.
///
/// Invoked synchronously on the removing call's thread, after the store's
/// lock has been released, so the callback may call back into the store.
pub type EvictionCallback = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

struct Shared {
    entries: RwLock<HashMap<String, Entry>>,
    max_entries: Option<usize>,
    on_eviction: Option<EvictionCallback>,
}

impl Shared {
    fn notify_eviction(&self, key: &str, value: &[u8]) {
        if let Some(callback) = &self.on_eviction {
            callback(key, value);
        }
    }

    /// One bounded pass over the map, removing entries whose deadline has
    /// passed. Returns the removed entries so the caller can dispatch
    /// eviction callbacks outside the lock.
    fn sweep(&self) -> Vec<(String, Entry)> {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let mut expired = Vec::new();
        for (inspected, (key, entry)) in entries.iter().enumerate() {
            if inspected >= SWEEP_BATCH {
                break;
            }
            if entry.is_expired(now) {
                expired.push(key.clone());
            }
        }

        expired
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|entry| (key, entry)))
            .collect()
    }
}

/// Thread-safe expiring key/value store with a background sweep task.
pub struct LocalCache {
    shared: Arc<Shared>,
    stop: watch::Sender<bool>,
    closed: AtomicBool,
}

/// Builder for [`LocalCache`].
pub struct LocalCacheBuilder {
    sweep_interval: Duration,
    max_entries: Option<usize>,
    on_eviction: Option<EvictionCallback>,
}

impl LocalCacheBuilder {
    /// Bound the store to at most `max_entries` entries.
    ///
    /// With a bound in place, `set` of a brand-new key on a full store
    /// fails with [`CacheError::OverCapacity`] instead of evicting; use
    /// [`LruCache`](crate::cache::LruCache) for automatic eviction.
    #[must_use]
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Observe every entry removed from the store.
    #[must_use]
    pub fn on_eviction(mut self, callback: EvictionCallback) -> Self {
        self.on_eviction = Some(callback);
        self
    }

    /// Build the store and spawn its sweep task.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn build(self) -> LocalCache {
        let shared = Arc::new(Shared {
            entries: RwLock::new(HashMap::new()),
            max_entries: self.max_entries,
            on_eviction: self.on_eviction,
        });
        let (stop, mut stopped) = watch::channel(false);

        let sweeper = Arc::clone(&shared);
        let interval = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of a fresh interval resolves immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    // Fires on close() and when the store handle is dropped.
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        for (key, entry) in sweeper.sweep() {
                            sweeper.notify_eviction(&key, &entry.value);
                        }
                    }
                }
            }
        });

        LocalCache { shared, stop, closed: AtomicBool::new(false) }
    }
}

impl LocalCache {
    /// Create an unbounded store whose sweep runs every `sweep_interval`.
    #[must_use]
    pub fn new(sweep_interval: Duration) -> Self {
        Self::builder(sweep_interval).build()
    }

    /// Start configuring a store with the given sweep interval.
    #[must_use]
    pub fn builder(sweep_interval: Duration) -> LocalCacheBuilder {
        LocalCacheBuilder { sweep_interval, max_entries: None, on_eviction: None }
    }

    /// Number of entries currently held, including not-yet-swept expired
    /// ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the background sweep.
    ///
    /// Entries stay readable after close but are no longer swept. Closing
    /// twice fails with [`CacheError::AlreadyClosed`].
    pub fn close(&self) -> CacheResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(CacheError::AlreadyClosed);
        }
        let _ = self.stop.send(true);
        Ok(())
    }
}

#[async_trait]
impl Cache for LocalCache {
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        let now = Instant::now();
        {
            let entries = self.shared.entries.read();
            match entries.get(key) {
                None => return Err(CacheError::not_found(key)),
                Some(entry) if !entry.is_expired(now) => return Ok(entry.value.clone()),
                Some(_) => {}
            }
        }

        // The entry looked expired under the read lock. Re-check under the
        // write lock: a concurrent set may have refreshed it in between,
        // and that refreshed entry must not be dropped.
        let removed = {
            let mut entries = self.shared.entries.write();
            match entries.get(key) {
                None => return Err(CacheError::not_found(key)),
                Some(entry) if !entry.is_expired(now) => return Ok(entry.value.clone()),
                Some(_) => entries.remove_entry(key),
            }
        };
        if let Some((key, entry)) = removed {
            self.shared.notify_eviction(&key, &entry.value);
        }
        Err(CacheError::not_found(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = self.shared.entries.write();
        if let Some(max_entries) = self.shared.max_entries {
            if !entries.contains_key(key) && entries.len() >= max_entries {
                return Err(CacheError::OverCapacity { capacity: max_entries });
            }
        }
        entries.insert(key.to_owned(), Entry::new(value, ttl, now));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let removed = self.shared.entries.write().remove_entry(key);
        if let Some((key, entry)) = removed {
            self.shared.notify_eviction(&key, &entry.value);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        self.shared.entries.read().get(key).is_some_and(|entry| !entry.is_expired(now))
    }

    async fn load_and_delete(&self, key: &str) -> CacheResult<Vec<u8>> {
        let now = Instant::now();
        let removed = self.shared.entries.write().remove_entry(key);
        match removed {
            None => Err(CacheError::not_found(key)),
            Some((key, entry)) => {
                self.shared.notify_eviction(&key, &entry.value);
                if entry.is_expired(now) {
                    Err(CacheError::not_found(key))
                } else {
                    Ok(entry.value)
                }
            }
        }
    }
}
