//! Expiry Index Module
//!
//! Keeps every live key ordered by its absolute expiry second so the sweep
//! can remove due entries from the front without scanning the whole cache.

use std::collections::{BTreeSet, HashMap};

// == Expiry Index ==
/// Ordered view of keys by expiry time.
///
/// `order` holds `(expires_at, key)` pairs, soonest first; `deadlines` maps
/// each key to its current position in `order`. Both always hold the same
/// key set.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    order: BTreeSet<(i64, String)>,
    deadlines: HashMap<String, i64>,
}

impl ExpiryIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Add Or Update ==
    /// Schedules `key` to expire at `expires_at` (Unix seconds).
    ///
    /// An existing key is moved to its new position.
    pub fn add_or_update(&mut self, key: &str, expires_at: i64) {
        match self.deadlines.get_mut(key) {
            Some(deadline) => {
                if *deadline == expires_at {
                    return;
                }
                let previous = std::mem::replace(deadline, expires_at);
                let mut record = self
                    .order
                    .take(&(previous, key.to_string()))
                    .unwrap_or_else(|| unreachable!("expiry index lost record for '{}'", key));
                record.0 = expires_at;
                self.order.insert(record);
            }
            None => {
                self.deadlines.insert(key.to_string(), expires_at);
                self.order.insert((expires_at, key.to_string()));
            }
        }
    }

    // == Pop Soonest ==
    /// Removes and returns the record that expires first.
    pub fn pop_soonest(&mut self) -> Option<(String, i64)> {
        let (expires_at, key) = self.order.pop_first()?;
        self.deadlines.remove(&key);
        Some((key, expires_at))
    }

    /// Returns the record that expires first without removing it.
    #[cfg(test)]
    pub fn peek_soonest(&self) -> Option<(&str, i64)> {
        self.order
            .first()
            .map(|(expires_at, key)| (key.as_str(), *expires_at))
    }

    // == Remove ==
    /// Removes `key`, returning its expiry second if it was scheduled.
    pub fn remove(&mut self, key: &str) -> Option<i64> {
        let (owned_key, expires_at) = self.deadlines.remove_entry(key)?;
        self.order.remove(&(expires_at, owned_key));
        Some(expires_at)
    }

    // == Deadline ==
    /// Returns the expiry second scheduled for `key`.
    pub fn deadline(&self, key: &str) -> Option<i64> {
        self.deadlines.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Iterates keys from soonest to latest expiry.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|(_, key)| key.as_str())
    }
}
