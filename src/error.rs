//! Error types for the cache
//!
//! Provides unified error handling using thiserror.
//!
//! Only configuration mistakes are errors. A missing or expired key is a
//! normal miss (`None` / `false`), never a `CacheError`.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A human-readable size string could not be parsed
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// The memory ceiling must be at least one byte
    #[error("Memory ceiling must be greater than zero")]
    ZeroCapacity,

    /// A single entry is larger than the whole memory ceiling
    #[error("Entry '{key}' needs {size} bytes but the memory ceiling is {max_size} bytes")]
    EntryTooLarge {
        key: String,
        size: u64,
        max_size: u64,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
