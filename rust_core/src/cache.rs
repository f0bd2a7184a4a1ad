//! Time-to-live cache shared by the adapters and the enrichment resolver.
//!
//! Keys are spread over independently locked shards so lookups and writes
//! for unrelated keys never wait on each other. Locks are only held for the
//! map operation itself, never across an upstream call.
//!
//! There is no eviction: the next accepted write for a key replaces the
//! previous entry. That is fine for a small, fixed symbol universe. Callers
//! with an unbounded key space should wrap this store with a size bound.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::time::Duration;

const DEFAULT_SHARDS: usize = 16;

/// Default TTL applied when no override is given (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub captured_at: DateTime<Utc>,
    /// Per-entry override of the store-wide TTL
    pub ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: DateTime<Utc>, default_ttl: Duration) -> bool {
        let ttl = self.ttl.unwrap_or(default_ttl);
        // A capture time ahead of `now` (clock skew) counts as age zero
        let age = now
            .signed_duration_since(self.captured_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age < ttl
    }
}

pub struct CacheStore<V> {
    shards: Vec<RwLock<FxHashMap<String, CacheEntry<V>>>>,
    ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_shards(ttl, DEFAULT_SHARDS)
    }

    pub fn with_shards(ttl: Duration, shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| RwLock::new(FxHashMap::default()))
            .collect();
        Self { shards, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn shard(&self, key: &str) -> &RwLock<FxHashMap<String, CacheEntry<V>>> {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Latest entry for `key`, fresh or not.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.shard(key).read().get(key).cloned()
    }

    /// Value for `key` only if it is still within its TTL at `now`.
    pub fn get_valid(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let shard = self.shard(key).read();
        shard
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.value.clone())
    }

    pub fn is_valid(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.shard(key)
            .read()
            .get(key)
            .map_or(false, |entry| entry.is_fresh(now, self.ttl))
    }

    /// Store `value` captured at `captured_at` under the store-wide TTL.
    ///
    /// Returns false when the write was discarded because the entry already
    /// present was captured later.
    pub fn put(&self, key: &str, value: V, captured_at: DateTime<Utc>) -> bool {
        self.insert(key, value, captured_at, None)
    }

    /// Same as [`CacheStore::put`] with a TTL specific to this entry.
    pub fn put_with_ttl(
        &self,
        key: &str,
        value: V,
        captured_at: DateTime<Utc>,
        ttl: Duration,
    ) -> bool {
        self.insert(key, value, captured_at, Some(ttl))
    }

    fn insert(
        &self,
        key: &str,
        value: V,
        captured_at: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> bool {
        let mut shard = self.shard(key).write();
        if let Some(existing) = shard.get(key) {
            if existing.captured_at > captured_at {
                return false;
            }
        }
        shard.insert(
            key.to_string(),
            CacheEntry {
                value,
                captured_at,
                ttl,
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    #[test]
    fn test_entry_valid_within_ttl() {
        let cache = CacheStore::new(Duration::from_secs(300));
        let t0 = Utc::now();
        cache.put("binance:BTC", 65000.0, t0);

        assert!(cache.is_valid("binance:BTC", t0 + ChronoDuration::seconds(299)));
        assert!(!cache.is_valid("binance:BTC", t0 + ChronoDuration::seconds(300)));
        assert_eq!(
            cache.get_valid("binance:BTC", t0 + ChronoDuration::seconds(10)),
            Some(65000.0)
        );
        assert_eq!(cache.get_valid("binance:BTC", t0 + ChronoDuration::seconds(301)), None);
        // Stale entries remain readable through get
        assert!(cache.get("binance:BTC").is_some());
    }

    #[test]
    fn test_missing_key_is_invalid() {
        let cache: CacheStore<f64> = CacheStore::default();
        assert!(!cache.is_valid("nope", Utc::now()));
        assert!(cache.get("nope").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_per_entry_ttl_override() {
        let cache = CacheStore::new(Duration::from_secs(300));
        let t0 = Utc::now();
        cache.put_with_ttl("alpha_vantage:ETH", 1.0, t0, Duration::from_secs(60));

        assert!(cache.is_valid("alpha_vantage:ETH", t0 + ChronoDuration::seconds(59)));
        assert!(!cache.is_valid("alpha_vantage:ETH", t0 + ChronoDuration::seconds(61)));
    }

    #[test]
    fn test_older_write_is_discarded() {
        let cache = CacheStore::new(Duration::from_secs(300));
        let t0 = Utc::now();

        assert!(cache.put("k", "newer", t0));
        assert!(!cache.put("k", "older", t0 - ChronoDuration::seconds(5)));
        assert_eq!(cache.get("k").unwrap().value, "newer");

        // Same capture time: last writer wins
        assert!(cache.put("k", "same-instant", t0));
        assert_eq!(cache.get("k").unwrap().value, "same-instant");
    }

    #[test]
    fn test_concurrent_writes_to_disjoint_keys() {
        let cache = Arc::new(CacheStore::new(Duration::from_secs(300)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        cache.put(&format!("p{}:S{}", i, j), j, Utc::now());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
