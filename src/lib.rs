//! TTL LRU Cache - an embedded, thread-safe key/value cache
//!
//! Entries expire after a caller-chosen TTL, total estimated memory stays
//! under a configurable ceiling by evicting the least recently written
//! entries, and every operation is safe to call from many threads.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod estimate;
pub mod memory;
pub mod size;
pub mod tasks;

pub use api::{Cache, CacheBuilder};
pub use cache::{CacheStats, ManualClock};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use estimate::{DeepSizeOf, SizeEstimator};
pub use memory::MemoryProbe;
pub use size::parse_size;
pub use tasks::{spawn_sweep_task, spawn_sweep_task_from_config};
