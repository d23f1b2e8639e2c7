//! Bucket Cache - A key/value cache stored in an object-storage bucket
//!
//! Provides get/set/add/delete/touch/clear with versioned keys and expiry
//! evaluated on read. Expired objects are reclaimed out of band by the
//! bucket's lifecycle policy.

pub mod cache;
pub mod config;
pub mod error;
pub mod store;

pub use cache::{BucketCache, Timeout};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use store::{MemoryStore, ObjectStore};
