//! Bounded read-through cache for external lookups.
//!
//! Storage and LRU/age eviction come from the `cached` stores; this module
//! only adds the hit-count expiry and the configuration shape.

use std::fmt;
use std::hash::Hash;

use cached::{Cached, SizedCache, TimedSizedCache};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheParams {
    /// Maximum number of entries; the least recently used is evicted.
    pub capacity: usize,
    /// Entries older than this are dropped on access.
    pub ttl_secs: Option<u64>,
    /// Entries are dropped after serving this many hits.
    pub max_hits: Option<u32>,
}

impl Default for CacheParams {
    fn default() -> Self {
        Self {
            capacity: 128,
            ttl_secs: None,
            max_hits: None,
        }
    }
}

#[derive(Clone)]
struct Entry<V> {
    value: V,
    hits: u32,
}

enum Store<K: Hash + Eq + Clone, V> {
    Lru(SizedCache<K, Entry<V>>),
    Timed(TimedSizedCache<K, Entry<V>>),
}

impl<K: Hash + Eq + Clone, V> Store<K, V> {
    fn get_mut(&mut self, key: &K) -> Option<&mut Entry<V>> {
        match self {
            Store::Lru(c) => c.cache_get_mut(key),
            Store::Timed(c) => c.cache_get_mut(key),
        }
    }

    fn set(&mut self, key: K, entry: Entry<V>) {
        match self {
            Store::Lru(c) => c.cache_set(key, entry),
            Store::Timed(c) => c.cache_set(key, entry),
        };
    }

    fn remove(&mut self, key: &K) -> bool {
        match self {
            Store::Lru(c) => c.cache_remove(key).is_some(),
            Store::Timed(c) => c.cache_remove(key).is_some(),
        }
    }

    fn clear(&mut self) {
        match self {
            Store::Lru(c) => c.cache_clear(),
            Store::Timed(c) => c.cache_clear(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Store::Lru(c) => c.cache_size(),
            Store::Timed(c) => c.cache_size(),
        }
    }
}

/// LRU map with optional age and hit-count expiry.
pub struct BoundedCache<K: Hash + Eq + Clone, V> {
    params: CacheParams,
    // `None` when the capacity is zero.
    store: Option<Store<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("params", &self.params)
            .field("len", &self.len())
            .finish()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(params: CacheParams) -> Self {
        let store = match (params.capacity, params.ttl_secs) {
            (0, _) => None,
            (size, None) => Some(Store::Lru(SizedCache::with_size(size))),
            (size, Some(ttl)) => Some(Store::Timed(TimedSizedCache::with_size_and_lifespan(
                size, ttl,
            ))),
        };
        Self { params, store }
    }

    pub fn params(&self) -> &CacheParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.store.as_ref().map_or(0, Store::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value for `key`; expired or used-up entries are dropped.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let max_hits = self.params.max_hits;
        let store = self.store.as_mut()?;
        let entry = store.get_mut(key)?;
        if max_hits.is_some_and(|m| entry.hits >= m) {
            store.remove(key);
            return None;
        }
        entry.hits += 1;
        Some(entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        if let Some(store) = self.store.as_mut() {
            store.set(key, Entry { value, hits: 0 });
        }
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.store.as_mut().is_some_and(|s| s.remove(key))
    }

    pub fn clear(&mut self) {
        if let Some(store) = self.store.as_mut() {
            store.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize, ttl_secs: Option<u64>, max_hits: Option<u32>) -> BoundedCache<String, u32> {
        BoundedCache::new(CacheParams {
            capacity,
            ttl_secs,
            max_hits,
        })
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut c = cache(2, None, None);
        c.insert("a".into(), 1);
        c.insert("b".into(), 2);
        assert_eq!(c.get(&"a".into()), Some(1));
        c.insert("c".into(), 3);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&"b".into()), None);
        assert_eq!(c.get(&"a".into()), Some(1));
        assert_eq!(c.get(&"c".into()), Some(3));
    }

    #[test]
    fn entries_expire_by_age() {
        let mut fresh = cache(4, Some(600), None);
        fresh.insert("flour".into(), 7);
        assert_eq!(fresh.get(&"flour".into()), Some(7));

        let mut stale = cache(4, Some(0), None);
        stale.insert("flour".into(), 7);
        assert_eq!(stale.get(&"flour".into()), None);
    }

    #[test]
    fn timed_store_still_bounded() {
        let mut c = cache(2, Some(600), None);
        for (i, k) in ["a", "b", "c"].into_iter().enumerate() {
            c.insert(k.into(), i as u32);
        }
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&"a".into()), None);
    }

    #[test]
    fn entries_expire_by_hit_count() {
        let mut c = cache(4, None, Some(2));
        c.insert("sugar".into(), 1);
        assert_eq!(c.get(&"sugar".into()), Some(1));
        assert_eq!(c.get(&"sugar".into()), Some(1));
        assert_eq!(c.get(&"sugar".into()), None);
        assert!(c.is_empty());
    }

    #[test]
    fn manual_invalidation_and_reinsert() {
        let mut c = cache(4, None, None);
        c.insert("salt".into(), 1);
        c.insert("salt".into(), 2);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(&"salt".into()), Some(2));
        assert!(c.invalidate(&"salt".into()));
        assert!(!c.invalidate(&"salt".into()));
        c.insert("a".into(), 1);
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut c = cache(0, None, None);
        c.insert("a".into(), 1);
        assert!(c.is_empty());
        assert_eq!(c.get(&"a".into()), None);
    }
}
