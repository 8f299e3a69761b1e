//! Capacity-bounded, time-expiring keyed store.
//!
//! `ExpiringCache` memoizes externally-fetched or expensively-computed
//! values. Entries are evicted least-recently-used first when the store is
//! full, and treated as absent once they are older than the store's TTL
//! (lazy expiry: a stale entry found at lookup time is removed then).
//!
//! The cache is a pure value store. It never knows how to produce a value
//! for a missing key and offers no single-flight guarantee: concurrent
//! misses for one key may each repopulate it, and the store converges to a
//! single value shortly after.

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::expiring";

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

pub struct ExpiringCache<K, V> {
    /// `None` for capacity 0: the cache degenerates to a no-op and every
    /// lookup misses.
    entries: Option<RwLock<LruCache<K, Entry<V>>>>,
    ttl: Duration,
    name: &'static str,
}

impl<K: Hash + Eq + PartialEq, V: Clone> ExpiringCache<K, V> {
    pub fn new(name: &'static str, capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| RwLock::new(LruCache::new(cap))),
            ttl,
            name,
        }
    }

    /// Return the value for `key` if present and not older than the TTL.
    ///
    /// A hit marks the key most-recently-used; a stale entry is evicted.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(entries) = &self.entries else {
            counter!("brezza_cache_miss_total", "cache" => self.name).increment(1);
            return None;
        };

        let mut guard = rw_write(entries, SOURCE, "get");
        let fresh = match guard.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => Some(entry.value.clone()),
            Some(_) => {
                guard.pop(key);
                None
            }
            None => None,
        };

        if fresh.is_some() {
            counter!("brezza_cache_hit_total", "cache" => self.name).increment(1);
        } else {
            counter!("brezza_cache_miss_total", "cache" => self.name).increment(1);
        }
        fresh
    }

    /// Insert or replace the entry for `key` with a fresh timestamp.
    ///
    /// The entry becomes most-recently-used; the least-recently-used entry
    /// is evicted if the store would overflow.
    pub fn put(&self, key: K, value: V) {
        let Some(entries) = &self.entries else {
            return;
        };

        let entry = Entry {
            value,
            inserted_at: Instant::now(),
        };
        let mut guard = rw_write(entries, SOURCE, "put");
        if let Some((old_key, _)) = guard.push(key, entry) {
            // push reports both replacement and eviction; only a different
            // key means an entry was pushed out for capacity.
            if guard.peek(&old_key).is_none() {
                counter!("brezza_cache_evict_total", "cache" => self.name).increment(1);
            }
        }
    }

    /// Drop the entry for `key`, if any.
    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(entries) = &self.entries {
            rw_write(entries, SOURCE, "remove").pop(key);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            rw_write(entries, SOURCE, "clear").clear();
        }
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        match &self.entries {
            Some(entries) => rw_read(entries, SOURCE, "len").len(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
