//! In-memory lock backend for tests and examples.
//!
//! Mirrors the remote store's observable behavior — atomic set-if-absent
//! with a ttl, compare-and-delete, compare-and-extend — against a plain
//! map, so the lock state machine can be exercised without a Redis
//! instance. Deadlines use `tokio::time::Instant` and therefore obey
//! paused-time tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::LockResult;
use crate::lock::LockCommands;

#[derive(Debug)]
struct Lease {
    token: String,
    deadline: Instant,
}

/// [`LockCommands`] over an in-process map.
#[derive(Debug, Default)]
pub struct InMemoryLockCommands {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryLockCommands {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every lease, simulating a flushed or failed-over store.
    pub fn clear(&self) {
        self.leases.lock().clear();
    }

    /// The token currently holding `key`, if any lease is live.
    #[must_use]
    pub fn holder(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.leases
            .lock()
            .get(key)
            .filter(|lease| lease.deadline > now)
            .map(|lease| lease.token.clone())
    }
}

#[async_trait]
impl LockCommands for InMemoryLockCommands {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let now = Instant::now();
        let mut leases = self.leases.lock();
        if leases.get(key).is_some_and(|lease| lease.deadline > now) {
            return Ok(false);
        }
        leases.insert(key.to_owned(), Lease { token: token.to_owned(), deadline: now + ttl });
        Ok(true)
    }

    async fn release(&self, key: &str, token: &str) -> LockResult<i64> {
        let now = Instant::now();
        let mut leases = self.leases.lock();
        let held = leases
            .get(key)
            .is_some_and(|lease| lease.deadline > now && lease.token == token);
        if held {
            leases.remove(key);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<i64> {
        let now = Instant::now();
        let mut leases = self.leases.lock();
        match leases.get_mut(key) {
            Some(lease) if lease.deadline > now && lease.token == token => {
                lease.deadline = now + ttl;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
