//! Error types for the bucket cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// A key that is simply not in the bucket is never an error; reads report it
/// as an absent value instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Caller supplied a key that cannot address an item
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Stored bytes do not match the item envelope
    #[error("Corrupt item at {key}: {reason}")]
    CorruptItem { key: String, reason: String },

    /// The object store failed (network, permissions, throttling)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Value could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation requires an existing item
    #[error("Key not found: {0}")]
    Missing(String),

    /// Arithmetic requested on a non-integer value
    #[error("Value at {0} is not an integer")]
    NotAnInteger(String),

    /// Integer or version arithmetic left the i64 range
    #[error("Arithmetic overflow for key: {0}")]
    Overflow(String),
}

impl CacheError {
    /// Builds a `CorruptItem` error for the given storage key.
    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        CacheError::CorruptItem {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
