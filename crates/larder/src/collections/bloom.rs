//! Probabilistic membership filter for cache-penetration protection.
//!
//! A definitely-absent verdict from the filter lets the penetration guard
//! reject a lookup without touching the system of record; a
//! possibly-present verdict falls through to the normal load path. Hashing
//! is keyed blake3 double hashing, seedable for deterministic tests.

use std::sync::Arc;

use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::cache::MembershipFilter;

/// Errors returned when constructing a [`BloomFilter`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BloomError {
    /// `expected_items` was zero or `false_positive_rate` outside (0, 1).
    #[error("invalid bloom filter parameters: expected_items={expected_items}, false_positive_rate={false_positive_rate}")]
    InvalidParameters {
        /// Requested expected item count.
        expected_items: usize,
        /// Requested false positive rate.
        false_positive_rate: f64,
    },

    /// The computed bitset would exceed the allocation ceiling.
    #[error("requested bloom filter size too large: {bits} bits")]
    AllocationTooLarge {
        /// The computed bitset size.
        bits: usize,
    },
}

/// Bloom filter over string keys.
///
/// ```
/// use larder::collections::BloomFilter;
///
/// let mut filter = BloomFilter::new(1000, 0.01).unwrap();
/// filter.insert("user:1");
///
/// assert!(filter.contains("user:1"));
/// assert!(!filter.contains("user:2"));
/// ```
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    bit_len: usize,
    num_hashes: usize,
    key: [u8; 32],
}

impl BloomFilter {
    /// Allocation ceiling for the bitset (~128 MiB).
    const MAX_BITS: usize = 1 << 30;

    /// Create a filter sized for `expected_items` at the given false
    /// positive rate, with random per-instance hash keys.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Result<Self, BloomError> {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::with_seed(expected_items, false_positive_rate, seed)
    }

    /// Create a filter with caller-provided seed material, for
    /// deterministic tests and reproducible deployments.
    pub fn with_seed(
        expected_items: usize,
        false_positive_rate: f64,
        seed: [u8; 32],
    ) -> Result<Self, BloomError> {
        if expected_items == 0 || !(0.0..1.0).contains(&false_positive_rate) {
            return Err(BloomError::InvalidParameters { expected_items, false_positive_rate });
        }

        let bit_len = Self::optimal_size(expected_items, false_positive_rate);
        let num_hashes = Self::optimal_hashes(bit_len, expected_items);
        if bit_len == 0 || num_hashes == 0 {
            return Err(BloomError::InvalidParameters { expected_items, false_positive_rate });
        }
        if bit_len > Self::MAX_BITS {
            return Err(BloomError::AllocationTooLarge { bits: bit_len });
        }

        // An all-zero seed would make the keyed hash degenerate.
        let mut key = seed;
        if key.iter().all(|&b| b == 0) {
            key = [0xA5; 32];
        }

        Ok(Self { bits: vec![0; bit_len.div_ceil(64)], bit_len, num_hashes, key })
    }

    /// Record `key` as present.
    pub fn insert(&mut self, key: &str) {
        let (h1, h2) = self.base_hashes(key);
        let m = self.bit_len as u64;
        for i in 0..self.num_hashes as u64 {
            let idx = h1.wrapping_add(i.wrapping_mul(h2)) % m;
            let (word, mask) = Self::bit_position(idx as usize);
            if let Some(entry) = self.bits.get_mut(word) {
                *entry |= mask;
            }
        }
    }

    /// Whether `key` might be present.
    ///
    /// `false` means definitely absent; `true` allows false positives.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let (h1, h2) = self.base_hashes(key);
        let m = self.bit_len as u64;
        (0..self.num_hashes as u64).all(|i| {
            let idx = h1.wrapping_add(i.wrapping_mul(h2)) % m;
            let (word, mask) = Self::bit_position(idx as usize);
            self.bits.get(word).is_some_and(|entry| entry & mask != 0)
        })
    }

    /// Reset every bit.
    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    /// Size of the filter in bits.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bit_len
    }

    /// Number of hash functions applied per key.
    #[must_use]
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    fn base_hashes(&self, key: &str) -> (u64, u64) {
        let h1 = self.keyed_hash(0u8, key.as_bytes());
        let h2 = self.keyed_hash(1u8, key.as_bytes());
        // Keep the second hash odd to avoid poor dispersion.
        (h1, h2 | 1)
    }

    fn keyed_hash(&self, domain: u8, data: &[u8]) -> u64 {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(&[domain]);
        hasher.update(data);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    fn bit_position(idx: usize) -> (usize, u64) {
        (idx / 64, 1u64 << (idx % 64) as u32)
    }

    // m = -n * ln(p) / (ln 2)^2
    fn optimal_size(n: usize, p: f64) -> usize {
        let m = -(n as f64 * p.ln()) / (2f64.ln()).powi(2);
        if m.is_finite() && m > 0.0 {
            m.ceil() as usize
        } else {
            0
        }
    }

    // k = (m / n) * ln 2
    fn optimal_hashes(m: usize, n: usize) -> usize {
        if n == 0 || m == 0 {
            return 0;
        }
        let k = (m as f64 / n as f64) * 2f64.ln();
        if k.is_finite() && k > 0.0 {
            k.ceil() as usize
        } else {
            0
        }
    }
}

/// A [`BloomFilter`] shared behind a read/write lock.
///
/// Filter population happens outside the cache path (and often on another
/// task), so the guard queries through this shared handle while the owner
/// keeps inserting.
#[derive(Debug, Clone)]
pub struct SharedBloomFilter {
    inner: Arc<RwLock<BloomFilter>>,
}

impl SharedBloomFilter {
    /// Wrap a filter for shared use.
    #[must_use]
    pub fn new(filter: BloomFilter) -> Self {
        Self { inner: Arc::new(RwLock::new(filter)) }
    }

    /// Record `key` as present.
    pub fn insert(&self, key: &str) {
        self.inner.write().insert(key);
    }

    /// Reset every bit.
    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

impl MembershipFilter for SharedBloomFilter {
    fn contains(&self, key: &str) -> bool {
        self.inner.read().contains(key)
    }
}
