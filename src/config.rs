//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Memory ceiling as a size string such as "64MB"; `None` uses the 1 MiB default
    pub max_memory: Option<String>,
    /// Background sweep task interval in seconds
    pub sweep_interval: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_MEMORY` - Memory ceiling, e.g. "100KB" (default: 1 MiB)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 1)
    ///
    /// The size string is validated when the cache is built, so a malformed
    /// value surfaces as an error there instead of silently falling back.
    pub fn from_env() -> Self {
        Self {
            max_memory: env::var("CACHE_MAX_MEMORY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or(1),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory: None,
            sweep_interval: 1,
        }
    }
}
