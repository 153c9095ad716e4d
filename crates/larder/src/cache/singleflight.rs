//! De-duplication of concurrent loads for the same key.
//!
//! One in-flight load per key: the first caller runs the load, every
//! concurrent caller for that key awaits the same resolve-once cell and
//! receives a clone of the same result. The map lock protects only cell
//! creation and removal, never the load itself.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::error::CacheResult;

type FlightCell = Arc<OnceCell<CacheResult<Vec<u8>>>>;

#[derive(Default)]
pub(crate) struct FlightGroup {
    inflight: Mutex<HashMap<String, FlightCell>>,
}

impl FlightGroup {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `load` for `key`, sharing the result with every concurrent call
    /// for the same key. Exactly one load runs per unresolved key at any
    /// time.
    pub(crate) async fn run<F, Fut>(&self, key: &str, load: F) -> CacheResult<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<Vec<u8>>>,
    {
        let cell = {
            let mut inflight = self.inflight.lock();
            match inflight.get(key) {
                Some(cell) => Arc::clone(cell),
                None => {
                    let cell: FlightCell = Arc::new(OnceCell::new());
                    inflight.insert(key.to_owned(), Arc::clone(&cell));
                    cell
                }
            }
        };

        let result = cell.get_or_init(load).await.clone();

        // Retire the flight so a later miss starts a fresh load. Guard on
        // cell identity: a racing caller may already have replaced it.
        let mut inflight = self.inflight.lock();
        if inflight.get(key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            inflight.remove(key);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::singleflight.
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::CacheError;

    /// Validates the shared result scenario: concurrent callers for one key
    /// trigger exactly one load and all observe its value.
    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let group = Arc::new(FlightGroup::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let group = Arc::clone(&group);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                group
                    .run("key", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(b"loaded".to_vec())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), b"loaded");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Validates the shared failure scenario: waiters receive the same
    /// error the single load produced.
    #[tokio::test]
    async fn waiters_share_the_failure() {
        let group = Arc::new(FlightGroup::new());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let group = Arc::clone(&group);
            handles.push(tokio::spawn(async move {
                group
                    .run("key", || async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Err(CacheError::backend("system of record down"))
                    })
                    .await
            }));
        }

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert_eq!(err, CacheError::backend("system of record down"));
        }
    }

    /// Validates the flight retirement scenario: once a flight resolves, a
    /// later call runs a fresh load instead of replaying the old result.
    #[tokio::test]
    async fn resolved_flight_is_retired() {
        let group = FlightGroup::new();
        let calls = AtomicUsize::new(0);

        for expected in [b"call-0".to_vec(), b"call-1".to_vec()] {
            let value = group
                .run("key", || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Ok(format!("call-{n}").into_bytes())
                })
                .await
                .unwrap();
            assert_eq!(value, expected);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Validates the independent keys scenario: loads for different keys
    /// never share a flight.
    #[tokio::test]
    async fn distinct_keys_fly_separately() {
        let group = Arc::new(FlightGroup::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for key in ["a", "b", "c"] {
            let group = Arc::clone(&group);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                group
                    .run(key, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(key.as_bytes().to_vec())
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
