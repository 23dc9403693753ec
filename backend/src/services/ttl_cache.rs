use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

/// Source of "now" for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used to expire cache entries in tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: std::time::Duration) {
        let by = Duration::from_std(by).unwrap_or_else(|_| Duration::days(365));
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Process-wide key/value cache with a single TTL for every entry.
///
/// Entries are independent per key, so concurrent readers and writers only
/// contend on the shard that holds the key.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(365)),
            clock,
        }
    }

    /// Returns the cached value if it has not expired. Expired entries are evicted.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(key) {
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
            drop(entry); // Release the read lock before removing
            self.entries.remove(key);
        }
        None
    }

    /// Stores a value and drops every entry that has already expired, so keys
    /// that are never read again do not pile up.
    pub fn insert(&self, key: K, value: V) {
        self.purge_expired();
        let expires_at = self.clock.now() + self.ttl;
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| now < entry.expires_at);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn cache_with_clock(ttl_secs: u64) -> (TtlCache<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = TtlCache::new(StdDuration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_hit_within_ttl() {
        let (cache, clock) = cache_with_clock(15);

        cache.insert("TCS.NS".to_string(), 7);
        clock.advance(StdDuration::from_secs(14));

        assert_eq!(cache.get(&"TCS.NS".to_string()), Some(7));
    }

    #[test]
    fn test_entry_expires_at_ttl() {
        let (cache, clock) = cache_with_clock(15);

        cache.insert("TCS.NS".to_string(), 7);
        clock.advance(StdDuration::from_secs(15));

        assert_eq!(cache.get(&"TCS.NS".to_string()), None);
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[test]
    fn test_keys_are_independent() {
        let (cache, clock) = cache_with_clock(10);

        cache.insert("A".to_string(), 1);
        clock.advance(StdDuration::from_secs(6));
        cache.insert("B".to_string(), 2);
        clock.advance(StdDuration::from_secs(6));

        assert_eq!(cache.get(&"A".to_string()), None);
        assert_eq!(cache.get(&"B".to_string()), Some(2));
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache_with_clock(5);

        cache.insert("A".to_string(), 1);
        cache.insert("B".to_string(), 2);
        clock.advance(StdDuration::from_secs(5));
        cache.purge_expired();

        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_insert_evicts_stale_keys() {
        let (cache, clock) = cache_with_clock(5);

        cache.insert("ONCE.NS".to_string(), 1);
        clock.advance(StdDuration::from_secs(6));
        cache.insert("OTHER.NS".to_string(), 2);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"OTHER.NS".to_string()), Some(2));
    }
}
