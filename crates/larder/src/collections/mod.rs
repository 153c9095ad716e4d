//! Supporting data structures for the bounded stores and the penetration
//! guard.

mod bloom;
mod lru;

pub use bloom::{BloomError, BloomFilter, SharedBloomFilter};
pub use lru::LruList;
