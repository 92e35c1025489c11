//! Public Cache Handle
//!
//! `Cache<V>` is the surface applications use. It translates size strings
//! and TTL durations into core calls and runs the lazy expiration sweep
//! before each read or write.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheCore, CacheStats, Clock, SystemClock, DEFAULT_MAX_MEMORY};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::estimate::{DeepSizeEstimator, DeepSizeOf, SizeEstimator};
use crate::memory::{MemoryProbe, SystemMemory};
use crate::size::parse_size;

// == Cache ==
/// Thread-safe key/value cache with per-entry TTL and a memory ceiling.
///
/// Cloning is cheap and every clone shares the same entries.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ttl_lru_cache::Cache;
///
/// let cache: Cache<String> = Cache::new();
/// cache.set_max_memory("100KB").unwrap();
///
/// cache.set("user:1", "Alice".to_string(), Duration::from_secs(60)).unwrap();
/// assert_eq!(cache.get("user:1"), Some("Alice".to_string()));
/// assert!(cache.exists("user:1"));
/// assert_eq!(cache.keys(), 1);
///
/// assert!(cache.del("user:1"));
/// assert!(cache.flush());
/// ```
pub struct Cache<V> {
    core: Arc<CacheCore<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<V> std::fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("core", &self.core).finish()
    }
}

impl<V: DeepSizeOf + Clone> Cache<V> {
    /// Creates a cache with a 1 MiB ceiling, the default size estimator, the
    /// system clock and the system memory probe.
    pub fn new() -> Self {
        let core = CacheCore::new(
            DEFAULT_MAX_MEMORY,
            Arc::new(SystemClock),
            Arc::new(SystemMemory::new()),
            Arc::new(DeepSizeEstimator),
        );
        match core {
            Ok(core) => Self {
                core: Arc::new(core),
            },
            Err(err) => unreachable!("default ceiling rejected: {}", err),
        }
    }

    /// Starts a builder using the default size estimator.
    pub fn builder() -> CacheBuilder<V> {
        CacheBuilder::new()
    }

    /// Creates a cache from environment-derived configuration.
    ///
    /// # Errors
    /// Fails if the configured memory ceiling is malformed or zero.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let builder = match &config.max_memory {
            Some(size) => Self::builder().max_memory(size),
            None => Self::builder(),
        };
        builder.build()
    }
}

impl<V: DeepSizeOf + Clone> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Cache<V> {
    // == Set Max Memory ==
    /// Sets the memory ceiling from a size string such as `"1KB"`, `"100KB"`,
    /// `"1MB"`, `"2MB"` or `"1GB"` (decimal units).
    ///
    /// Returns `Ok(false)` if the machine could not provide that much memory.
    /// Lowering the ceiling evicts least recently written entries.
    ///
    /// # Errors
    /// Fails on a malformed or zero size; the cache is not modified.
    pub fn set_max_memory(&self, size: &str) -> Result<bool> {
        let bytes = parse_size(size)?;
        self.core.clear_expired();
        self.core.set_max_memory(bytes)
    }

    // == Set ==
    /// Stores `value` under `key`, expiring after `ttl` (whole seconds).
    ///
    /// May evict other entries to stay under the ceiling.
    ///
    /// # Errors
    /// Fails if this single entry is larger than the whole ceiling.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) -> Result<()> {
        self.core.clear_expired();
        self.core.set(key.into(), value, ttl)
    }

    // == Get ==
    /// Retrieves a clone of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.core.clear_expired();
        self.core.get(key)
    }

    // == Delete ==
    /// Removes `key`. Returns whether a live entry was removed.
    pub fn del(&self, key: &str) -> bool {
        self.core.clear_expired();
        self.core.del(key)
    }

    // == Exists ==
    /// Returns whether a live entry is stored under `key`.
    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Flush ==
    /// Removes every entry. Always succeeds.
    pub fn flush(&self) -> bool {
        self.core.flush()
    }

    // == Keys ==
    /// Returns the number of live entries.
    pub fn keys(&self) -> usize {
        self.core.clear_expired();
        self.core.keys()
    }

    /// Runs the expiration sweep now (still at most once per second).
    pub fn clear_expired(&self) -> usize {
        self.core.clear_expired()
    }

    /// Estimated bytes held by all entries.
    pub fn used_memory(&self) -> u64 {
        self.core.used_memory()
    }

    /// Current memory ceiling in bytes.
    pub fn max_memory(&self) -> u64 {
        self.core.max_memory()
    }

    /// Bytes `set(key, value, _)` would charge against the ceiling.
    pub fn entry_size(&self, key: &str, value: &V) -> u64 {
        self.core.entry_size(key, value)
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.core.stats()
    }

    #[cfg(test)]
    pub(crate) fn core_for_tests(&self) -> &CacheCore<V> {
        &self.core
    }
}

// == Cache Builder ==
enum MaxMemory {
    Bytes(u64),
    Text(String),
}

/// Configures a [`Cache`] before it is created.
pub struct CacheBuilder<V> {
    max_memory: MaxMemory,
    estimator: Arc<dyn SizeEstimator<V>>,
    clock: Arc<dyn Clock>,
    memory: Arc<dyn MemoryProbe>,
}

impl<V: DeepSizeOf> CacheBuilder<V> {
    /// Builder with the default [`DeepSizeOf`] estimator.
    pub fn new() -> Self {
        Self::with_estimator(DeepSizeEstimator)
    }
}

impl<V: DeepSizeOf> Default for CacheBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheBuilder<V> {
    /// Builder for values sized by a custom estimator.
    pub fn with_estimator(estimator: impl SizeEstimator<V> + 'static) -> Self {
        Self {
            max_memory: MaxMemory::Bytes(DEFAULT_MAX_MEMORY),
            estimator: Arc::new(estimator),
            clock: Arc::new(SystemClock),
            memory: Arc::new(SystemMemory::new()),
        }
    }

    /// Memory ceiling as a size string; parsed by [`build`](Self::build).
    pub fn max_memory(self, size: &str) -> Self {
        Self {
            max_memory: MaxMemory::Text(size.to_string()),
            ..self
        }
    }

    /// Memory ceiling in bytes.
    pub fn max_memory_bytes(self, bytes: u64) -> Self {
        Self {
            max_memory: MaxMemory::Bytes(bytes),
            ..self
        }
    }

    /// Replaces the size estimator.
    pub fn estimator(self, estimator: impl SizeEstimator<V> + 'static) -> Self {
        Self {
            estimator: Arc::new(estimator),
            ..self
        }
    }

    /// Replaces the clock, e.g. with a shared [`ManualClock`](crate::cache::ManualClock).
    pub fn clock<C: Clock + 'static>(self, clock: Arc<C>) -> Self {
        Self { clock, ..self }
    }

    /// Replaces the available-memory probe.
    pub fn memory_probe(self, probe: impl MemoryProbe + 'static) -> Self {
        Self {
            memory: Arc::new(probe),
            ..self
        }
    }

    /// Creates the cache.
    ///
    /// # Errors
    /// Fails if the ceiling is malformed or zero.
    pub fn build(self) -> Result<Cache<V>>
    where
        V: Clone,
    {
        let max_memory = match self.max_memory {
            MaxMemory::Bytes(bytes) => bytes,
            MaxMemory::Text(size) => parse_size(&size)?,
        };

        let core = CacheCore::new(max_memory, self.clock, self.memory, self.estimator)?;
        debug!("Cache created with a {} byte ceiling", max_memory);
        Ok(Cache {
            core: Arc::new(core),
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::error::CacheError;

    const START: i64 = 1_700_000_000;

    fn manual_cache(max_memory: u64) -> (Cache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_secs(START));
        let cache = Cache::builder()
            .max_memory_bytes(max_memory)
            .clock(clock.clone())
            .memory_probe(|| u64::MAX)
            .build()
            .unwrap();
        (cache, clock)
    }

    #[test]
    fn test_new_uses_default_ceiling() {
        let cache: Cache<String> = Cache::new();
        assert_eq!(cache.max_memory(), DEFAULT_MAX_MEMORY);
        assert_eq!(cache.keys(), 0);
    }

    #[test]
    fn test_builder_parses_size_string() {
        let cache: Cache<String> = Cache::builder().max_memory("2MB").build().unwrap();
        assert_eq!(cache.max_memory(), 2_000_000);
    }

    #[test]
    fn test_builder_rejects_bad_ceilings() {
        let result = Cache::<String>::builder().max_memory("lots").build();
        assert!(matches!(result, Err(CacheError::InvalidSize(_))));

        let result = Cache::<String>::builder().max_memory_bytes(0).build();
        assert!(matches!(result, Err(CacheError::ZeroCapacity)));
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            max_memory: Some("100KB".to_string()),
            sweep_interval: 1,
        };
        let cache: Cache<String> = Cache::from_config(&config).unwrap();
        assert_eq!(cache.max_memory(), 100_000);

        let cache: Cache<String> = Cache::from_config(&CacheConfig::default()).unwrap();
        assert_eq!(cache.max_memory(), DEFAULT_MAX_MEMORY);
    }

    #[test]
    fn test_set_max_memory_bad_string_keeps_state() {
        let (cache, _) = manual_cache(10_000);
        cache
            .set("a", "v".to_string(), Duration::from_secs(60))
            .unwrap();

        assert!(matches!(
            cache.set_max_memory("ten bytes"),
            Err(CacheError::InvalidSize(_))
        ));
        assert_eq!(
            cache.set_max_memory("0KB"),
            Err(CacheError::ZeroCapacity)
        );
        assert_eq!(cache.max_memory(), 10_000);
        assert!(cache.exists("a"));
    }

    #[test]
    fn test_set_max_memory_rejected_by_probe() {
        let cache: Cache<String> = Cache::builder()
            .max_memory("1KB")
            .memory_probe(|| 9_000)
            .build()
            .unwrap();

        assert_eq!(cache.set_max_memory("10KB"), Ok(true));
        assert_eq!(cache.set_max_memory("1GB"), Ok(false));
        assert_eq!(cache.max_memory(), 10_000);
    }

    #[test]
    fn test_custom_estimator() {
        let cache: Cache<Vec<u8>> = CacheBuilder::with_estimator(|v: &Vec<u8>| v.len() as u64)
            .memory_probe(|| u64::MAX)
            .build()
            .unwrap();

        let value = vec![0u8; 500];
        let expected = cache.entry_size("blob", &value);
        cache
            .set("blob", value, Duration::from_secs(60))
            .unwrap();
        assert_eq!(cache.used_memory(), expected);
    }

    #[test]
    fn test_expired_entry_disappears_after_sweep() {
        let (cache, clock) = manual_cache(10_000);
        cache
            .set("k", "v".to_string(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.keys(), 0);
        assert_eq!(cache.get("k"), None);
        assert!(!cache.exists("k"));
        assert!(!cache.del("k"));
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let (cache, _) = manual_cache(10_000);
        let other = cache.clone();

        cache
            .set("shared", "v".to_string(), Duration::from_secs(60))
            .unwrap();

        assert!(other.exists("shared"));
        assert!(other.del("shared"));
        assert!(!cache.exists("shared"));
    }
}
