//! Cache Item Module
//!
//! The `(value, expiry)` envelope stored as one object per cache key.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Item ==
/// A stored value with its absolute expiry.
///
/// Serialized as `{"value": ..., "expiry": <epoch seconds | null>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheItem<T = Value> {
    /// The stored value
    pub value: T,
    /// Expiration timestamp (Unix seconds), None = no expiration
    pub expiry: Option<f64>,
}

impl<T> CacheItem<T> {
    // == Constructor ==
    pub fn new(value: T, expiry: Option<f64>) -> Self {
        Self { value, expiry }
    }

    // == Is Expired ==
    /// Checks whether the item is expired at `now` (Unix seconds).
    ///
    /// Only a set expiry strictly before `now` counts; a zero expiry is a
    /// real timestamp, not "no expiry".
    pub fn is_expired_at(&self, now: f64) -> bool {
        match self.expiry {
            Some(expiry) => expiry < now,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining seconds at `now`, or None if the item never expires.
    ///
    /// # Returns
    /// - `Some(0.0)` if the item has expired
    /// - `Some(remaining)` if the item has an expiry that hasn't passed
    /// - `None` if the item never expires
    pub fn ttl_remaining(&self, now: f64) -> Option<f64> {
        self.expiry.map(|expiry| (expiry - now).max(0.0))
    }
}

impl<T: Serialize> CacheItem<T> {
    // == Encode ==
    /// Serializes the envelope to JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}

impl CacheItem<Value> {
    // == Decode ==
    /// Parses stored bytes. `key` only labels errors.
    ///
    /// Both fields must be present; `expiry` must be a number or null.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| CacheError::corrupt(key, e))?;

        let Value::Object(mut fields) = document else {
            return Err(CacheError::corrupt(key, "item is not a JSON object"));
        };

        let value = fields
            .remove("value")
            .ok_or_else(|| CacheError::corrupt(key, "missing field `value`"))?;

        let expiry = match fields.remove("expiry") {
            None => return Err(CacheError::corrupt(key, "missing field `expiry`")),
            Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(
                n.as_f64()
                    .ok_or_else(|| CacheError::corrupt(key, "expiry out of range"))?,
            ),
            Some(other) => {
                return Err(CacheError::corrupt(
                    key,
                    format!("expiry must be a number or null, got {}", other),
                ))
            }
        };

        Ok(Self { value, expiry })
    }

    /// Deserializes the value into the caller's type.
    pub fn into_typed<T: DeserializeOwned>(self, key: &str) -> Result<CacheItem<T>> {
        let value = serde_json::from_value(self.value).map_err(|e| CacheError::corrupt(key, e))?;
        Ok(CacheItem {
            value,
            expiry: self.expiry,
        })
    }
}
