//! Cache stores and decorators.
//!
//! Everything here satisfies one capability contract, [`Cache`], so stores
//! and decorators compose freely:
//!
//! - [`LocalCache`] — in-process expiring store with a background sweep
//!   and an optional refuse-when-full capacity bound.
//! - [`LruCache`] — in-process expiring store bounded by entry count with
//!   least-recently-used eviction.
//! - [`ReadThroughCache`] — load-on-miss from a [`Loader`], in four
//!   consistency/latency modes including single-flight de-duplication.
//! - [`WriteThroughCache`] — persist to a [`Persister`] before caching.
//! - [`BloomFilterCache`] — read-through gated by a [`MembershipFilter`]
//!   against cache-penetration storms.
//!
//! A typical chain wires a guard in front of a read-through decorator in
//! front of a store:
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use larder::cache::{BloomFilterCache, LocalCache, Loader, MembershipFilter};
//!
//! # fn wire(filter: Arc<dyn MembershipFilter>, loader: Arc<dyn Loader>) {
//! let store = Arc::new(LocalCache::new(Duration::from_secs(1)));
//! let cache = BloomFilterCache::new(store, filter, loader, Some(Duration::from_secs(60)));
//! # }
//! ```

mod bloom;
mod entry;
mod local;
mod lru;
mod read_through;
mod singleflight;
mod store;
mod write_through;

pub use bloom::{BloomFilterCache, MembershipFilter};
pub use local::{EvictionCallback, LocalCache, LocalCacheBuilder};
pub use lru::LruCache;
pub use read_through::{Loader, ReadThroughCache};
pub use store::Cache;
pub use write_through::{Persister, WriteThroughCache};
