//! Expiration Sweep Task
//!
//! Background task that periodically removes expired cache entries.
//!
//! The cache already sweeps lazily before each operation; this task only
//! matters for caches that go quiet while holding expired entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::Cache;
use crate::config::CacheConfig;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Each sweep goes through the cache's normal rate limit,
/// so it never runs more than once per second however short the interval.
///
/// # Arguments
/// * `cache` - Handle to the cache to sweep
/// * `interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache: Cache<String> = Cache::new();
/// let sweep_handle = spawn_sweep_task(cache.clone(), 1);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<V>(cache: Cache<V>, interval_secs: u64) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiration sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.clear_expired();

            if removed > 0 {
                info!("Expiration sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiration sweep: no expired entries found");
            }
        }
    })
}

/// Spawns the sweep task at the interval configured by
/// `CACHE_SWEEP_INTERVAL`.
pub fn spawn_sweep_task_from_config<V>(cache: Cache<V>, config: &CacheConfig) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    spawn_sweep_task(cache, config.sweep_interval)
}
