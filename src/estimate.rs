//! Size Estimation Module
//!
//! Approximates how many bytes a cached value occupies. The cache only needs
//! an estimate: shared allocations are counted once per owner and allocator
//! overhead is ignored.
//!
//! Values are measured through [`DeepSizeOf`] by default; derive it on your
//! own value types with `#[derive(DeepSizeOf)]`.

use std::mem::size_of;

pub use deepsize::DeepSizeOf;
use serde_json::Value;

// == Size Estimator ==
/// Pluggable `estimate_size(value) -> bytes` used by the cache.
///
/// Any `Fn(&V) -> u64 + Send + Sync` closure is an estimator, which makes it
/// easy to charge fixed sizes in tests or to plug in a domain-specific
/// measure.
pub trait SizeEstimator<V>: Send + Sync {
    fn estimate_size(&self, value: &V) -> u64;
}

impl<V, F> SizeEstimator<V> for F
where
    F: Fn(&V) -> u64 + Send + Sync,
{
    fn estimate_size(&self, value: &V) -> u64 {
        self(value)
    }
}

/// Default estimator: inline size plus owned heap bytes, via [`DeepSizeOf`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DeepSizeEstimator;

impl<V: DeepSizeOf> SizeEstimator<V> for DeepSizeEstimator {
    fn estimate_size(&self, value: &V) -> u64 {
        value.deep_size_of() as u64
    }
}

// == JSON Values ==
/// Rough per-entry share of a B-tree node's length and edge bookkeeping.
const BTREE_ENTRY_OVERHEAD: u64 = 2 * size_of::<usize>() as u64;

/// Estimator for `serde_json::Value`, which cannot implement [`DeepSizeOf`]
/// here.
///
/// ```
/// use serde_json::Value;
/// use ttl_lru_cache::estimate::json_value_size;
/// use ttl_lru_cache::{Cache, CacheBuilder};
///
/// let cache: Cache<Value> = CacheBuilder::with_estimator(json_value_size).build().unwrap();
/// ```
pub fn json_value_size(value: &Value) -> u64 {
    size_of::<Value>() as u64 + json_heap_size(value)
}

fn json_heap_size(value: &Value) -> u64 {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
        Value::String(s) => s.capacity() as u64,
        Value::Array(items) => {
            let spare = ((items.capacity() - items.len()) * size_of::<Value>()) as u64;
            spare + items.iter().map(json_value_size).sum::<u64>()
        }
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| BTREE_ENTRY_OVERHEAD + k.deep_size_of() as u64 + json_value_size(v))
            .sum(),
    }
}

// == Entry Overhead ==
/// Per-entry index slots: expiry deadline (ordered set + lookup map) and the
/// recency node (size, prev, next) plus its lookup map slot.
const INDEX_SLOT_BYTES: u64 =
    (2 * size_of::<i64>() + size_of::<u64>() + 3 * size_of::<usize>()) as u64;

/// Bookkeeping bytes charged for an entry on top of its value.
///
/// The key is held three times (value store, expiry index, recency index),
/// each copy with its own `String` header.
pub fn entry_overhead(key: &str) -> u64 {
    let key_bytes = (size_of::<String>() + key.len()) as u64;
    3 * key_bytes + INDEX_SLOT_BYTES
}
