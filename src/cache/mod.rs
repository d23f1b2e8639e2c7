//! Cache Module
//!
//! Cache semantics over an object store: versioned key hashing, the stored
//! item envelope, expiry evaluated on read, and batched bulk deletion.

mod clock;
mod engine;
mod item;
mod key;
mod timeout;


// Re-export public types
pub use clock::{epoch_seconds, Clock, ManualClock, SystemClock};
pub use engine::BucketCache;
pub use item::CacheItem;
pub use key::{default_key_function, KeyEncoder, KeyFunction};
pub use timeout::Timeout;
