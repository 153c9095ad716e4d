//! Redis-backed implementation of the cache capability.

use std::time::Duration;

use async_trait::async_trait;
use larder::cache::Cache;
use larder::{CacheError, CacheResult};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

fn backend(err: redis::RedisError) -> CacheError {
    CacheError::backend(err.to_string())
}

/// Remote [`Cache`] over a multiplexed Redis connection.
///
/// Holds no local state beyond the connection handle; the manager
/// reconnects on its own, so clones of one `RedisCache` share a single
/// underlying connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Wrap an existing connection manager.
    #[must_use]
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Connect to the Redis instance at `url`.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = ConnectionManager::new(client).await.map_err(backend)?;
        Ok(Self { conn })
    }

    /// The underlying connection, for callers that also run a
    /// [`LockClient`](crate::lock::LockClient) against the same instance.
    #[must_use]
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(backend)?;
        value.ok_or_else(|| CacheError::not_found(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn
                .pset_ex(key, value, ttl.as_millis() as u64)
                .await
                .map_err(backend),
            None => conn.set(key, value).await.map_err(backend),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.del(key).await.map_err(backend)
    }

    async fn exists(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        conn.exists(key).await.unwrap_or(false)
    }

    async fn load_and_delete(&self, key: &str) -> CacheResult<Vec<u8>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        value.ok_or_else(|| CacheError::not_found(key))
    }
}
