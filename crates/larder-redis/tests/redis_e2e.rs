//! End-to-end tests against a real Redis instance.
//!
//! Ignored by default; run with a local Redis on the default port:
//!
//! ```text
//! cargo test -p larder-redis --test redis_e2e -- --ignored
//! ```

use std::time::Duration;

use larder::cache::Cache;
use larder_redis::lock::LockClient;
use larder_redis::{LockError, RedisCache};

const REDIS_URL: &str = "redis://127.0.0.1:6379";

async fn store() -> RedisCache {
    RedisCache::connect(REDIS_URL).await.expect("redis must be running for e2e tests")
}

#[tokio::test]
#[ignore = "requires a local Redis"]
async fn e2e_store_roundtrip() {
    let cache = store().await;
    let key = "larder:e2e:roundtrip";

    cache.set(key, b"value".to_vec(), Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(cache.get(key).await.unwrap(), b"value");
    assert!(cache.exists(key).await);

    cache.delete(key).await.unwrap();
    assert!(cache.get(key).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore = "requires a local Redis"]
async fn e2e_store_load_and_delete_claims_once() {
    let cache = store().await;
    let key = "larder:e2e:claim";

    cache.set(key, b"payload".to_vec(), Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(cache.load_and_delete(key).await.unwrap(), b"payload");
    assert!(cache.load_and_delete(key).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore = "requires a local Redis"]
async fn e2e_store_ttl_expires() {
    let cache = store().await;
    let key = "larder:e2e:ttl";

    cache.set(key, b"short".to_vec(), Some(Duration::from_millis(200))).await.unwrap();
    assert_eq!(cache.get(key).await.unwrap(), b"short");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(cache.get(key).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore = "requires a local Redis"]
async fn e2e_lock_mutual_exclusion_and_hand_off() {
    let cache = store().await;
    let client = LockClient::redis(cache.connection());
    let key = "larder:e2e:lock";
    let ttl = Duration::from_secs(10);

    let a = client.try_lock(key, ttl).await.unwrap();
    assert_eq!(client.try_lock(key, ttl).await.unwrap_err(), LockError::Failed);

    a.unlock().await.unwrap();
    let b = client.try_lock(key, ttl).await.unwrap();
    b.unlock().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a local Redis"]
async fn e2e_lock_refresh_and_stale_release() {
    let cache = store().await;
    let client = LockClient::redis(cache.connection());
    let key = "larder:e2e:lease";

    // A short lease that the holder refreshes past its original deadline.
    let held = client.try_lock(key, Duration::from_millis(500)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    held.refresh().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        client.try_lock(key, Duration::from_secs(1)).await.unwrap_err(),
        LockError::Failed
    );
    held.unlock().await.unwrap();

    // A lapsed lease re-acquired by someone else: the stale holder's
    // release and refresh both surface the lost lease.
    let stale = client.try_lock(key, Duration::from_millis(100)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let fresh = client.try_lock(key, Duration::from_secs(10)).await.unwrap();

    assert_eq!(stale.refresh().await.unwrap_err(), LockError::RefreshFailed);
    assert_eq!(stale.unlock().await.unwrap_err(), LockError::NotHeld);
    fresh.unlock().await.unwrap();
}
