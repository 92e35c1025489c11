//! Cache Engine Module
//!
//! Owns the single reader/writer lock around the [`CacheStore`] and is the
//! only writer to it. Also holds the collaborators the store does not know
//! about: the clock, the memory probe and the size estimator.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::cache::clock::{expiry_deadline, Clock};
use crate::cache::stats::StatsCounters;
use crate::cache::{CacheStats, CacheStore};
use crate::error::{CacheError, Result};
use crate::estimate::{entry_overhead, SizeEstimator};
use crate::memory::MemoryProbe;

// == Cache Core ==
/// Thread-safe cache engine.
pub struct CacheCore<V> {
    store: RwLock<CacheStore<V>>,
    /// Unix second of the last expiration sweep
    last_sweep: AtomicI64,
    clock: Arc<dyn Clock>,
    memory: Arc<dyn MemoryProbe>,
    estimator: Arc<dyn SizeEstimator<V>>,
    stats: StatsCounters,
}

impl<V> std::fmt::Debug for CacheCore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store.read();
        f.debug_struct("CacheCore")
            .field("entries", &store.len())
            .field("used_memory", &store.used_size())
            .field("max_memory", &store.max_size())
            .field("last_sweep", &self.last_sweep.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<V: Clone> CacheCore<V> {
    // == Constructor ==
    /// Creates an empty cache core.
    ///
    /// # Errors
    /// Returns [`CacheError::ZeroCapacity`] if `max_memory` is zero.
    pub fn new(
        max_memory: u64,
        clock: Arc<dyn Clock>,
        memory: Arc<dyn MemoryProbe>,
        estimator: Arc<dyn SizeEstimator<V>>,
    ) -> Result<Self> {
        if max_memory == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        let now = clock.now_secs();
        Ok(Self {
            store: RwLock::new(CacheStore::new(max_memory)),
            last_sweep: AtomicI64::new(now),
            clock,
            memory,
            estimator,
            stats: StatsCounters::default(),
        })
    }

    // == Set Max Memory ==
    /// Changes the memory ceiling, evicting least recently written entries
    /// if the new ceiling is lower than what is stored.
    ///
    /// Returns `Ok(false)` without changing anything when `bytes` is more
    /// than the system could provide: the probe's available memory plus the
    /// memory this cache is already allowed to hold.
    pub fn set_max_memory(&self, bytes: u64) -> Result<bool> {
        if bytes == 0 {
            return Err(CacheError::ZeroCapacity);
        }

        let mut store = self.store.write();
        let available = self
            .memory
            .available_memory()
            .saturating_add(store.max_size());
        if bytes > available {
            warn!(
                "Rejected memory ceiling of {} bytes: only {} bytes available",
                bytes, available
            );
            return Ok(false);
        }

        let previous = store.max_size();
        let evicted = store.set_max_size(bytes)?;
        self.stats.record_evictions(evicted.len());

        info!(
            "Memory ceiling changed from {} to {} bytes, evicted {} entries",
            previous,
            bytes,
            evicted.len()
        );
        Ok(true)
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Overwriting a key replaces its value, restarts its TTL and makes it
    /// the most recently written entry. May evict other entries.
    ///
    /// # Errors
    /// Returns [`CacheError::EntryTooLarge`] if the entry alone exceeds the
    /// memory ceiling; the cache is left unchanged.
    pub fn set(&self, key: String, value: V, ttl: Duration) -> Result<()> {
        let size = self
            .estimator
            .estimate_size(&value)
            .saturating_add(entry_overhead(&key));

        let mut store = self.store.write();
        let expires_at = expiry_deadline(self.clock.now(), ttl);
        let evicted = store.insert(key, value, expires_at, size).map_err(|err| {
            warn!("{}", err);
            err
        })?;

        if !evicted.is_empty() {
            debug!("Evicted {} entries: {:?}", evicted.len(), evicted);
            self.stats.record_evictions(evicted.len());
        }
        Ok(())
    }

    // == Get ==
    /// Retrieves a clone of the value stored under `key`.
    ///
    /// Reads do not refresh recency; only writes do.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_secs();
        let value = self.store.read().get(key, now).cloned();

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    // == Delete ==
    /// Removes `key`. Returns whether it was present.
    pub fn del(&self, key: &str) -> bool {
        self.store.write().remove(key).is_some()
    }

    // == Flush ==
    /// Removes every entry, keeping the memory ceiling.
    pub fn flush(&self) -> bool {
        let mut store = self.store.write();
        store.clear();
        self.last_sweep
            .store(self.clock.now_secs(), Ordering::Relaxed);
        true
    }

    // == Keys ==
    /// Returns the number of live entries.
    pub fn keys(&self) -> usize {
        self.store.read().len()
    }

    // == Clear Expired ==
    /// Removes entries whose expiry second has passed.
    ///
    /// Runs at most once per second: the last sweep time is checked without
    /// the lock first, then again once the write lock is held. Returns the
    /// number of entries removed.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now_secs();
        if now <= self.last_sweep.load(Ordering::Relaxed) {
            return 0;
        }

        let mut store = self.store.write();
        let now = self.clock.now_secs();
        if now <= self.last_sweep.load(Ordering::Relaxed) {
            return 0;
        }

        let expired = store.purge_expired(now);
        self.last_sweep.store(now, Ordering::Relaxed);

        if !expired.is_empty() {
            debug!("Expiration sweep removed {} entries", expired.len());
            self.stats.record_expirations(expired.len());
        }
        expired.len()
    }

    /// Estimated bytes held by all entries.
    pub fn used_memory(&self) -> u64 {
        self.store.read().used_size()
    }

    /// Current memory ceiling in bytes.
    pub fn max_memory(&self) -> u64 {
        self.store.read().max_size()
    }

    /// Bytes an entry would be charged, including bookkeeping.
    pub fn entry_size(&self, key: &str, value: &V) -> u64 {
        self.estimator
            .estimate_size(value)
            .saturating_add(entry_overhead(key))
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let store = self.store.read();
        self.stats
            .snapshot(store.len(), store.used_size(), store.max_size())
    }

    #[cfg(test)]
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&CacheStore<V>) -> R) -> R {
        f(&self.store.read())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    const START: i64 = 1_700_000_000;
    const PAYLOAD: u64 = 100;

    fn core_with(max_memory: u64, available: u64) -> (CacheCore<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_secs(START));
        let core = CacheCore::new(
            max_memory,
            clock.clone(),
            Arc::new(move || available),
            Arc::new(|_: &String| PAYLOAD),
        )
        .unwrap();
        (core, clock)
    }

    /// Ceiling that fits exactly `n` single-letter entries.
    fn fits(n: u64) -> u64 {
        n * (PAYLOAD + entry_overhead("a"))
    }

    #[test]
    fn test_core_rejects_zero_ceiling() {
        let result = CacheCore::<String>::new(
            0,
            Arc::new(ManualClock::at_secs(START)),
            Arc::new(|| u64::MAX),
            Arc::new(|_: &String| 1),
        );
        assert!(matches!(result, Err(CacheError::ZeroCapacity)));
    }

    #[test]
    fn test_core_set_and_get() {
        let (core, _) = core_with(fits(10), u64::MAX);

        core.set("key1".to_string(), "value1".to_string(), Duration::from_secs(60))
            .unwrap();

        assert_eq!(core.get("key1"), Some("value1".to_string()));
        assert_eq!(core.get("missing"), None);
        assert_eq!(core.keys(), 1);
        assert_eq!(core.used_memory(), PAYLOAD + entry_overhead("key1"));

        let stats = core.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_core_overwrite_resets_ttl() {
        let (core, clock) = core_with(fits(10), u64::MAX);

        core.set("k".to_string(), "v1".to_string(), Duration::from_secs(2))
            .unwrap();
        clock.advance(Duration::from_secs(1));
        core.set("k".to_string(), "v2".to_string(), Duration::from_secs(10))
            .unwrap();
        clock.advance(Duration::from_secs(5));

        assert_eq!(core.clear_expired(), 0);
        assert_eq!(core.get("k"), Some("v2".to_string()));
        assert_eq!(core.keys(), 1);
    }

    #[test]
    fn test_core_get_does_not_refresh_recency() {
        let (core, _) = core_with(fits(2), u64::MAX);
        let ttl = Duration::from_secs(60);

        core.set("a".to_string(), "1".to_string(), ttl).unwrap();
        core.set("b".to_string(), "2".to_string(), ttl).unwrap();
        assert!(core.get("a").is_some());

        core.set("c".to_string(), "3".to_string(), ttl).unwrap();

        assert_eq!(core.get("a"), None);
        assert!(core.get("b").is_some());
        assert!(core.get("c").is_some());
        assert_eq!(core.stats().evictions, 1);
    }

    #[test]
    fn test_core_entry_too_large() {
        let (core, _) = core_with(fits(1) - 1, u64::MAX);

        let result = core.set("a".to_string(), "x".to_string(), Duration::from_secs(60));
        assert!(matches!(result, Err(CacheError::EntryTooLarge { .. })));
        assert_eq!(core.keys(), 0);
        assert_eq!(core.used_memory(), 0);
    }

    #[test]
    fn test_core_huge_estimate_is_too_large_not_overflow() {
        let core = CacheCore::new(
            1_000,
            Arc::new(ManualClock::at_secs(START)),
            Arc::new(|| u64::MAX),
            Arc::new(|_: &String| u64::MAX),
        )
        .unwrap();

        assert_eq!(core.entry_size("k", &"v".to_string()), u64::MAX);
        let result = core.set("k".to_string(), "v".to_string(), Duration::from_secs(60));
        assert_eq!(
            result,
            Err(CacheError::EntryTooLarge {
                key: "k".to_string(),
                size: u64::MAX,
                max_size: 1_000,
            })
        );
        assert_eq!(core.keys(), 0);
    }

    #[test]
    fn test_core_ceiling_at_u64_max() {
        let core = CacheCore::new(
            u64::MAX,
            Arc::new(ManualClock::at_secs(START)),
            Arc::new(|| u64::MAX),
            Arc::new(|_: &String| u64::MAX / 2 + 10),
        )
        .unwrap();
        let ttl = Duration::from_secs(60);

        core.set("a".to_string(), "1".to_string(), ttl).unwrap();
        core.set("b".to_string(), "2".to_string(), ttl).unwrap();

        assert_eq!(core.get("a"), None);
        assert_eq!(core.get("b"), Some("2".to_string()));
        assert_eq!(core.stats().evictions, 1);
        core.with_store(|store| store.assert_consistent());
    }

    #[test]
    fn test_core_del() {
        let (core, _) = core_with(fits(10), u64::MAX);
        core.set("k".to_string(), "v".to_string(), Duration::from_secs(60))
            .unwrap();

        assert!(core.del("k"));
        assert!(!core.del("k"));
        assert_eq!(core.used_memory(), 0);
        core.with_store(|store| store.assert_consistent());
    }

    #[test]
    fn test_core_clear_expired_is_rate_limited() {
        let (core, clock) = core_with(fits(10), u64::MAX);
        core.set("short".to_string(), "v".to_string(), Duration::from_secs(1))
            .unwrap();
        core.set("long".to_string(), "v".to_string(), Duration::from_secs(100))
            .unwrap();

        // same second as construction: no sweep
        assert_eq!(core.clear_expired(), 0);

        clock.advance(Duration::from_secs(2));
        assert_eq!(core.clear_expired(), 1);
        assert_eq!(core.keys(), 1);

        // already swept this second
        core.set("instant".to_string(), "v".to_string(), Duration::ZERO)
            .unwrap();
        clock.advance(Duration::from_millis(100));
        assert_eq!(core.clear_expired(), 0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(core.clear_expired(), 1);
        assert_eq!(core.stats().expirations, 2);
        core.with_store(|store| store.assert_consistent());
    }

    #[test]
    fn test_core_get_never_returns_expired_value_before_sweep() {
        let (core, clock) = core_with(fits(10), u64::MAX);
        core.set("k".to_string(), "v".to_string(), Duration::from_secs(1))
            .unwrap();

        clock.advance(Duration::from_secs(1));
        assert!(core.get("k").is_some());

        clock.advance(Duration::from_secs(1));
        assert_eq!(core.get("k"), None);
        // not swept yet
        assert_eq!(core.keys(), 1);
    }

    #[test]
    fn test_core_set_max_memory_lowers_and_evicts() {
        let (core, _) = core_with(fits(4), u64::MAX);
        for key in ["a", "b", "c", "d"] {
            core.set(key.to_string(), "v".to_string(), Duration::from_secs(60))
                .unwrap();
        }

        assert_eq!(core.set_max_memory(fits(2)), Ok(true));

        assert_eq!(core.max_memory(), fits(2));
        assert_eq!(core.keys(), 2);
        assert_eq!(core.get("a"), None);
        assert_eq!(core.get("b"), None);
        assert!(core.get("c").is_some());
        assert!(core.get("d").is_some());
        core.with_store(|store| store.assert_consistent());
    }

    #[test]
    fn test_core_set_max_memory_rejects_unavailable() {
        let (core, _) = core_with(1_000, 5_000);

        assert_eq!(core.set_max_memory(6_000), Ok(true));
        assert_eq!(core.max_memory(), 6_000);

        // 5_000 free + 6_000 already granted
        assert_eq!(core.set_max_memory(11_001), Ok(false));
        assert_eq!(core.max_memory(), 6_000);
        assert_eq!(core.set_max_memory(11_000), Ok(true));
    }

    #[test]
    fn test_core_set_max_memory_zero() {
        let (core, _) = core_with(1_000, u64::MAX);
        assert_eq!(core.set_max_memory(0), Err(CacheError::ZeroCapacity));
        assert_eq!(core.max_memory(), 1_000);
    }

    #[test]
    fn test_core_flush_keeps_ceiling() {
        let (core, _) = core_with(fits(10), u64::MAX);
        core.set("a".to_string(), "v".to_string(), Duration::from_secs(60))
            .unwrap();

        assert!(core.flush());
        assert!(core.flush());

        assert_eq!(core.keys(), 0);
        assert_eq!(core.used_memory(), 0);
        assert_eq!(core.max_memory(), fits(10));
        assert_eq!(core.get("a"), None);
    }
}
