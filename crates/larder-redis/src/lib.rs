//! Redis-backed store and distributed lock for `larder`.
//!
//! [`RedisCache`] implements the [`larder::cache::Cache`] capability over
//! a multiplexed Redis connection, so the local decorators wrap it
//! unchanged. [`lock::LockClient`] provides token-guarded distributed
//! mutual exclusion: atomic acquire, compare-and-delete release,
//! compare-and-extend refresh, a blocking acquire loop with pluggable
//! backoff, and an auto-refresh lease-renewal loop.
//!
//! Lock re-entrancy is out of scope: each acquisition is its own lease
//! with its own token, even for one caller.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod error;
pub mod lock;
pub mod retry;
mod store;
pub mod testing;

pub use error::{LockError, LockResult};
pub use lock::{Lock, LockClient};
pub use retry::{FixedIntervalRetry, RetryStrategy};
pub use store::RedisCache;
