//! Cache Store Module
//!
//! Combines the value map with the expiry and LRU indices. Every mutation
//! goes through here so the three structures always hold the same key set.
//! The store itself is not synchronised; `CacheCore` wraps it in a lock.

use std::collections::HashMap;

use crate::cache::{ExpiryIndex, LruIndex};
use crate::error::Result;

// == Cache Store ==
/// Value map plus the two orderings over its keys.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    values: HashMap<String, V>,
    /// Keys ordered by expiry second
    expiry: ExpiryIndex,
    /// Keys ordered by write recency, with sizes
    lru: LruIndex,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store bounded by `max_size` bytes.
    pub fn new(max_size: u64) -> Self {
        Self {
            values: HashMap::new(),
            expiry: ExpiryIndex::new(),
            lru: LruIndex::new(max_size),
        }
    }

    // == Insert ==
    /// Stores `value` under `key`, replacing any previous value, resetting
    /// its expiry and making it the most recently written key.
    ///
    /// Returns the keys evicted to make room. If the entry can never fit,
    /// the error is returned and the store is left exactly as it was.
    pub fn insert(&mut self, key: String, value: V, expires_at: i64, size: u64) -> Result<Vec<String>> {
        let evicted = self.lru.add_or_update(&key, size)?;
        for victim in &evicted {
            self.values.remove(victim);
            self.expiry.remove(victim);
        }

        self.expiry.add_or_update(&key, expires_at);
        self.values.insert(key, value);
        Ok(evicted)
    }

    // == Get ==
    /// Returns the value for `key` unless it expired before `now_secs`.
    pub fn get(&self, key: &str, now_secs: i64) -> Option<&V> {
        let value = self.values.get(key)?;
        match self.expiry.deadline(key) {
            Some(expires_at) if expires_at < now_secs => None,
            _ => Some(value),
        }
    }

    // == Remove ==
    /// Removes `key` from all three structures, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let value = self.values.remove(key)?;
        self.expiry.remove(key);
        self.lru.remove(key);
        Some(value)
    }

    // == Purge Expired ==
    /// Removes every entry whose expiry second is strictly before `now_secs`.
    ///
    /// Walks the expiry order from the front and stops at the first entry
    /// that is not yet due, so the cost follows the number of expired keys.
    pub fn purge_expired(&mut self, now_secs: i64) -> Vec<String> {
        let mut expired = Vec::new();
        while let Some((key, expires_at)) = self.expiry.pop_soonest() {
            if expires_at >= now_secs {
                self.expiry.add_or_update(&key, expires_at);
                break;
            }
            self.values.remove(&key);
            self.lru.remove(&key);
            expired.push(key);
        }
        expired
    }

    // == Set Max Size ==
    /// Changes the memory ceiling, removing whatever the LRU index evicts.
    pub fn set_max_size(&mut self, max_size: u64) -> Result<Vec<String>> {
        let evicted = self.lru.set_max_size(max_size)?;
        for victim in &evicted {
            self.values.remove(victim);
            self.expiry.remove(victim);
        }
        Ok(evicted)
    }

    // == Clear ==
    /// Drops every entry, keeping the current ceiling.
    pub fn clear(&mut self) {
        *self = Self::new(self.lru.max_size());
    }

    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Estimated bytes held by all entries.
    pub fn used_size(&self) -> u64 {
        self.lru.size()
    }

    pub fn max_size(&self) -> u64 {
        self.lru.max_size()
    }

    /// Checks that the value map and both indices agree.
    ///
    /// # Panics
    /// Panics with a description of the first mismatch found.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        use std::collections::HashSet;

        let values: HashSet<&str> = self.values.keys().map(String::as_str).collect();
        let expiry: HashSet<&str> = self.expiry.keys().collect();
        let lru: HashSet<&str> = self.lru.keys().collect();

        assert_eq!(values, expiry, "value map and expiry index disagree");
        assert_eq!(values, lru, "value map and LRU index disagree");
        assert_eq!(self.expiry.len(), self.values.len());
        assert_eq!(self.lru.len(), self.values.len());

        let summed: u64 = self.lru.keys().filter_map(|k| self.lru.size_of(k)).sum();
        assert_eq!(summed, self.lru.size(), "LRU size does not match node sizes");
        assert!(self.lru.size() <= self.lru.max_size(), "ceiling exceeded");
    }

    /// Keys from most to least recently written.
    #[cfg(test)]
    pub fn recency(&self) -> Vec<&str> {
        self.lru.keys().collect()
    }
}
