//! Integration tests for the in-process stores.
//!
//! Exercises TTL expiry against the background sweep, the capacity
//! policies of both bounded stores, and concurrent access through the
//! shared `Cache` contract.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use larder::cache::{Cache, LocalCache, LruCache};
use larder::CacheError;

/// Walks the canonical expiry timeline against a sweeping store.
///
/// # Test Steps
/// 1. Create a store sweeping every 10 ms and set "a" with a 100 ms ttl
/// 2. At t=50ms the value is still readable
/// 3. At t=250ms the entry is gone — by sweep or lazy check, either way
///    strictly after its deadline plus one sweep interval
#[tokio::test(start_paused = true)]
async fn ttl_expiry_timeline() {
    let cache = LocalCache::new(Duration::from_millis(10));
    cache.set("a", b"1".to_vec(), Some(Duration::from_millis(100))).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get("a").await.unwrap(), b"1");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(cache.get("a").await.unwrap_err().is_not_found());
    // The sweep alone must have dropped the entry well before the read.
    assert_eq!(cache.len(), 0);
}

/// Verifies that entries without a ttl survive arbitrarily long, across
/// many sweep ticks.
#[tokio::test(start_paused = true)]
async fn unbounded_lifetime_without_ttl() {
    let cache = LocalCache::new(Duration::from_secs(1));
    cache.set("persistent", b"value".to_vec(), None).await.unwrap();

    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(cache.get("persistent").await.unwrap(), b"value");
}

/// Walks the canonical LRU scenario: capacity 2, `put(a) put(b) get(a)
/// put(c)` evicts `b` while `a` and `c` remain.
#[tokio::test]
async fn lru_access_order_scenario() {
    let cache = LruCache::new(NonZeroUsize::new(2).unwrap());

    cache.set("a", b"1".to_vec(), None).await.unwrap();
    cache.set("b", b"2".to_vec(), None).await.unwrap();
    assert_eq!(cache.get("a").await.unwrap(), b"1");
    cache.set("c", b"3".to_vec(), None).await.unwrap();

    assert!(cache.get("b").await.unwrap_err().is_not_found());
    assert_eq!(cache.get("a").await.unwrap(), b"1");
    assert_eq!(cache.get("c").await.unwrap(), b"3");
}

/// Inserting N+1 distinct keys into a capacity-N store evicts exactly the
/// least-recently-inserted key and nothing else.
#[tokio::test]
async fn lru_evicts_exactly_one() {
    const N: usize = 8;
    let evictions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evictions);
    let cache = LruCache::new(NonZeroUsize::new(N).unwrap())
        .with_on_eviction(Arc::new(move |_key, _value| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

    for i in 0..=N {
        cache.set(&format!("key-{i}"), vec![i as u8], None).await.unwrap();
    }

    assert_eq!(evictions.load(Ordering::SeqCst), 1);
    assert!(cache.get("key-0").await.unwrap_err().is_not_found());
    for i in 1..=N {
        assert!(cache.exists(&format!("key-{i}")).await);
    }
}

/// The count-capped store refuses new keys instead of evicting, and the
/// rejection carries the configured capacity.
#[tokio::test]
async fn count_capped_store_surfaces_over_capacity() {
    let cache = LocalCache::builder(Duration::from_secs(60)).max_entries(3).build();

    for i in 0..3 {
        cache.set(&format!("key-{i}"), vec![i], None).await.unwrap();
    }

    match cache.set("key-3", vec![3], None).await {
        Err(CacheError::OverCapacity { capacity }) => assert_eq!(capacity, 3),
        other => panic!("expected OverCapacity, got {other:?}"),
    }

    // Every original entry is untouched.
    for i in 0..3 {
        assert!(cache.exists(&format!("key-{i}")).await);
    }
}

/// Hammers one store from many tasks mixing sets, gets, and deletes; the
/// store stays consistent and every surviving key reads back its own
/// value.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mixed_workload() {
    let cache = Arc::new(LocalCache::new(Duration::from_millis(50)));

    let mut handles = Vec::new();
    for task in 0..8u8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for i in 0..50u8 {
                let key = format!("task-{task}-key-{i}");
                cache.set(&key, vec![task, i], None).await.unwrap();
                assert_eq!(cache.get(&key).await.unwrap(), vec![task, i]);
                if i % 5 == 0 {
                    cache.delete(&key).await.unwrap();
                    assert!(!cache.exists(&key).await);
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // 8 tasks x 50 keys, with every fifth key deleted again.
    assert_eq!(cache.len(), 8 * 50 - 8 * 10);
}

/// A store handle can be closed exactly once; the data stays readable
/// afterwards.
#[tokio::test]
async fn close_stops_sweep_but_not_reads() {
    let cache = LocalCache::new(Duration::from_millis(10));
    cache.set("a", b"1".to_vec(), None).await.unwrap();

    cache.close().unwrap();
    assert_eq!(cache.close().unwrap_err(), CacheError::AlreadyClosed);

    assert_eq!(cache.get("a").await.unwrap(), b"1");
}
