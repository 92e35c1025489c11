//! API Module
//!
//! The embedded library surface of the cache.
//!
//! # Operations
//! - `set_max_memory(size)` - Set the memory ceiling from a size string
//! - `set(key, value, ttl)` - Store a value with a time-to-live
//! - `get(key)` - Retrieve a value
//! - `del(key)` - Delete a key
//! - `exists(key)` - Check whether a key is live
//! - `flush()` - Remove every entry
//! - `keys()` - Count live entries

mod cache;

pub use cache::{Cache, CacheBuilder};
