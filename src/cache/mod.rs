//! Cache Module
//!
//! Provides the eviction/expiration engine: an expiry-ordered index, a
//! size-bounded LRU index, and the core that keeps both consistent with the
//! value map under one lock.

mod clock;
mod engine;
mod expiry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use clock::{expiry_deadline, Clock, ManualClock, SystemClock};
pub use engine::CacheCore;
pub use expiry::ExpiryIndex;
pub use lru::LruIndex;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Memory ceiling used when none is configured (1 MiB)
pub const DEFAULT_MAX_MEMORY: u64 = 1024 * 1024;
