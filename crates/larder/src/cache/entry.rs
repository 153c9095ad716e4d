//! Stored entry representation shared by the in-process stores.

use std::time::Duration;

use tokio::time::Instant;

/// A stored value with an optional absolute deadline.
///
/// `deadline: None` means the entry never expires. Entries are owned
/// exclusively by the store that created them and are only mutated under
/// that store's lock.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) value: Vec<u8>,
    pub(crate) deadline: Option<Instant>,
}

impl Entry {
    /// Build an entry whose deadline is `now + ttl`, or one that never
    /// expires when `ttl` is `None`.
    pub(crate) fn new(value: Vec<u8>, ttl: Option<Duration>, now: Instant) -> Self {
        Self { value, deadline: ttl.map(|ttl| now + ttl) }
    }

    /// Whether the entry's deadline has passed as of `now`.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now > deadline)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::Entry;

    /// Validates the deadline arithmetic scenario: an entry without a ttl
    /// never expires, one with a ttl expires strictly after `now + ttl`.
    #[test]
    fn deadline_arithmetic() {
        let now = Instant::now();

        let forever = Entry::new(b"v".to_vec(), None, now);
        assert!(!forever.is_expired(now + Duration::from_secs(3600)));

        let bounded = Entry::new(b"v".to_vec(), Some(Duration::from_secs(10)), now);
        assert!(!bounded.is_expired(now + Duration::from_secs(10)));
        assert!(bounded.is_expired(now + Duration::from_secs(11)));
    }
}
