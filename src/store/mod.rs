//! Object Store Module
//!
//! Abstract interface to the bucket that backs the cache, plus an in-process
//! implementation.

mod listing;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use listing::object_keys;
pub use memory::{CallStats, MemoryStore, DEFAULT_PAGE_SIZE};

// == Public Constants ==
/// Largest number of keys a single batch delete may carry
pub const MAX_DELETE_BATCH: usize = 1000;

// == Store Error ==
/// Failures reported by an object store client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection or transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Request rejected for rate limiting
    #[error("request throttled: {0}")]
    Throttled(String),

    /// Credentials do not allow the request
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Batch delete left some keys in place
    #[error("batch delete failed for {} key(s)", .0.len())]
    BatchRejected(Vec<String>),
}

/// Convenience Result type for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Fetched ==
/// Outcome of reading a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Object body
    Found(Vec<u8>),
    /// No object under that key
    NotFound,
}

// == List Page ==
/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Object keys on this page
    pub keys: Vec<String>,
    /// Token for the next page, None on the last page
    pub next_continuation: Option<String>,
}

// == Object Store Trait ==
/// Minimal bucket client the cache is built on.
///
/// Implementations own durability, request timeouts and retries. Single-key
/// reads are expected to observe prior writes; listings may lag.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `body` under `key`, replacing any existing object.
    async fn put_object(&self, key: &str, body: Vec<u8>) -> StoreResult<()>;

    /// Reads the object under `key`.
    async fn get_object(&self, key: &str) -> StoreResult<Fetched>;

    /// Removes the object under `key`. Removing a missing object succeeds.
    async fn delete_object(&self, key: &str) -> StoreResult<()>;

    /// Returns the page of keys following `continuation` (first page on None).
    async fn list_objects(&self, continuation: Option<String>) -> StoreResult<ListPage>;

    /// Removes up to `max_delete_batch()` objects in one request.
    async fn delete_objects(&self, keys: &[String]) -> StoreResult<()>;

    /// Batch limit for `delete_objects`.
    fn max_delete_batch(&self) -> usize {
        MAX_DELETE_BATCH
    }
}
