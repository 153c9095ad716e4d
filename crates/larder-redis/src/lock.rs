//! Redis-backed distributed mutual exclusion.
//!
//! Ownership is proven by an opaque token: acquiring sets `key → token`
//! atomically only if the key is absent, and release/refresh are Lua
//! scripts that compare the stored token before mutating. Each of the
//! three operations is a single indivisible round-trip — checking
//! ownership and mutating in two steps would let another holder slip in
//! between.
//!
//! A lease that is never released expires on its own through the ttl, so
//! a crashed holder cannot wedge the resource; a live holder keeps the
//! lease alive with [`Lock::refresh`] or the [`Lock::auto_refresh`] loop.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use larder_redis::lock::LockClient;
//!
//! # async fn demo(conn: redis::aio::ConnectionManager) -> larder_redis::LockResult<()> {
//! let client = LockClient::redis(conn);
//! let lock = client.try_lock("job-17", Duration::from_secs(30)).await?;
//! // ... the resource is exclusively ours while the lease lasts ...
//! lock.unlock().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::error::{LockError, LockResult};
use crate::retry::RetryStrategy;

/// Delete the key only if it still stores our token; reports the number
/// of keys deleted.
const UNLOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Reset the ttl only if the key still stores our token; reports whether
/// a lease matched.
const REFRESH_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

/// The atomic operations a lock backend must provide.
///
/// Every method is one indivisible remote operation. The trait exists so
/// the lock state machine can be driven against an in-memory backend in
/// tests; production uses [`RedisLockCommands`].
#[async_trait]
pub trait LockCommands: Send + Sync {
    /// Set `key → token` with `ttl` only if `key` is absent. Returns
    /// whether the key was created.
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool>;

    /// Delete `key` only if it stores `token`. Returns the number of keys
    /// deleted.
    async fn release(&self, key: &str, token: &str) -> LockResult<i64>;

    /// Reset the ttl of `key` only if it stores `token`. Returns the
    /// number of leases matched.
    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<i64>;
}

/// [`LockCommands`] over Redis: `SET NX PX` plus two Lua scripts.
pub struct RedisLockCommands {
    conn: ConnectionManager,
    unlock: Script,
    refresh: Script,
}

impl RedisLockCommands {
    /// Build the command set over an existing connection.
    #[must_use]
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn, unlock: Script::new(UNLOCK_SCRIPT), refresh: Script::new(REFRESH_SCRIPT) }
    }
}

#[async_trait]
impl LockCommands for RedisLockCommands {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &str, token: &str) -> LockResult<i64> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self.unlock.key(key).arg(token).invoke_async(&mut conn).await?;
        Ok(deleted)
    }

    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<i64> {
        let mut conn = self.conn.clone();
        let matched: i64 = self
            .refresh
            .key(key)
            .arg(token)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;
        Ok(matched)
    }
}

/// Acquires [`Lock`]s against a shared backend.
#[derive(Clone)]
pub struct LockClient {
    commands: Arc<dyn LockCommands>,
}

impl LockClient {
    /// Build a client over any [`LockCommands`] backend.
    pub fn new(commands: Arc<dyn LockCommands>) -> Self {
        Self { commands }
    }

    /// Build a client over a Redis connection.
    #[must_use]
    pub fn redis(conn: ConnectionManager) -> Self {
        Self::new(Arc::new(RedisLockCommands::new(conn)))
    }

    /// Attempt a single atomic acquisition of `key` with the given lease.
    ///
    /// Fails with [`LockError::Failed`] when the lock is already held by
    /// someone else.
    pub async fn try_lock(&self, key: &str, ttl: Duration) -> LockResult<Lock> {
        let token = Uuid::new_v4().to_string();
        if self.commands.try_acquire(key, &token, ttl).await? {
            Ok(Lock::new(Arc::clone(&self.commands), key.to_owned(), token, ttl))
        } else {
            Err(LockError::Failed)
        }
    }

    /// Acquire `key`, retrying contention according to `retry`.
    ///
    /// One token identifies the caller across every attempt. Each attempt
    /// is bounded by `attempt_timeout`; an attempt that times out is a
    /// transient condition and retries immediately without consuming the
    /// retry budget. Contention consults `retry` for the next backoff
    /// interval and fails with [`LockError::Failed`] once the strategy is
    /// exhausted. Cancelling `cancel` aborts the loop with
    /// [`LockError::Cancelled`], leaving no partial lock behind — each
    /// attempt is atomic and single-shot.
    pub async fn lock<R>(
        &self,
        key: &str,
        ttl: Duration,
        attempt_timeout: Duration,
        mut retry: R,
        cancel: &CancellationToken,
    ) -> LockResult<Lock>
    where
        R: RetryStrategy,
    {
        let token = Uuid::new_v4().to_string();
        loop {
            if cancel.is_cancelled() {
                return Err(LockError::Cancelled);
            }
            match timeout(attempt_timeout, self.commands.try_acquire(key, &token, ttl)).await {
                Err(_elapsed) => {
                    warn!(operation = "lock", key, "acquire attempt timed out, retrying");
                    continue;
                }
                Ok(Err(err)) => return Err(err),
                Ok(Ok(true)) => {
                    return Ok(Lock::new(
                        Arc::clone(&self.commands),
                        key.to_owned(),
                        token,
                        ttl,
                    ));
                }
                Ok(Ok(false)) => {
                    let Some(interval) = retry.next() else {
                        return Err(LockError::Failed);
                    };
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = cancel.cancelled() => return Err(LockError::Cancelled),
                    }
                }
            }
        }
    }
}

/// A held (or once-held) lease on a key.
///
/// The token is the sole proof of ownership and is immutable after
/// construction; the mutual exclusion that matters lives in the remote
/// store, enforced by the atomic scripts.
pub struct Lock {
    commands: Arc<dyn LockCommands>,
    key: String,
    token: String,
    ttl: Duration,
    released: CancellationToken,
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock")
            .field("key", &self.key)
            .field("token", &self.token)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Lock {
    fn new(commands: Arc<dyn LockCommands>, key: String, token: String, ttl: Duration) -> Self {
        Self { commands, key, token, ttl, released: CancellationToken::new() }
    }

    /// The locked key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock.
    ///
    /// The release signal fires regardless of the outcome, ending any
    /// [`auto_refresh`](Self::auto_refresh) loop. Zero deletions — the
    /// lease expired, or another holder owns the key now — fail with
    /// [`LockError::NotHeld`] so a lost-lease race is never silent.
    pub async fn unlock(&self) -> LockResult<()> {
        self.released.cancel();
        let deleted = self.commands.release(&self.key, &self.token).await?;
        if deleted == 1 {
            Ok(())
        } else {
            Err(LockError::NotHeld)
        }
    }

    /// Extend the lease back to its full ttl.
    ///
    /// Zero matches means the lease was lost; the caller must stop
    /// treating the resource as exclusively owned.
    pub async fn refresh(&self) -> LockResult<()> {
        let matched = self.commands.refresh(&self.key, &self.token, self.ttl).await?;
        if matched == 1 {
            Ok(())
        } else {
            Err(LockError::RefreshFailed)
        }
    }

    /// Keep the lease alive until the lock is released.
    ///
    /// Every `interval`, issues a refresh bounded by `attempt_timeout`. A
    /// timed-out attempt is transient and retries immediately; any other
    /// refresh failure is fatal to the loop and returned — the caller
    /// must assume the lock may be lost. Returns `Ok(())` when the
    /// release signal fires.
    pub async fn auto_refresh(
        &self,
        interval: Duration,
        attempt_timeout: Duration,
    ) -> LockResult<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick of a fresh interval resolves immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = self.released.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    loop {
                        tokio::select! {
                            _ = self.released.cancelled() => return Ok(()),
                            attempt = timeout(attempt_timeout, self.refresh()) => match attempt {
                                Err(_elapsed) => {
                                    warn!(operation = "refresh", key = %self.key, "lease refresh timed out, retrying");
                                }
                                Ok(Ok(())) => break,
                                Ok(Err(err)) => return Err(err),
                            }
                        }
                    }
                }
            }
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        // An abandoned lock must not keep a refresh loop alive; the
        // remote lease then lapses through its ttl.
        self.released.cancel();
    }
}
