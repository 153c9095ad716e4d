//! In-process caching primitives.
//!
//! `larder` provides a thread-safe expiring key/value store with pluggable
//! eviction, an LRU-bounded variant, and a family of decorators that add
//! read-through, write-through, and anti-penetration semantics with
//! single-flight de-duplication of concurrent loads. Every store and
//! decorator satisfies the same [`cache::Cache`] capability, so any
//! decorator can wrap any backing store — including the Redis store from
//! the companion `larder-redis` crate.
//!
//! The local stores are per-process only: nothing here persists across
//! restarts or coordinates caches between processes.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod collections;
pub mod error;

pub use cache::Cache;
pub use error::{CacheError, CacheResult};
