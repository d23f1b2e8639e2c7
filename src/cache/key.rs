//! Key Encoder Module
//!
//! Maps a logical cache key plus version and prefix to a fixed-length,
//! bucket-safe object key.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Builds the pre-hash key from `(raw_key, prefix, version)`.
pub type KeyFunction = fn(key: &str, prefix: &str, version: i64) -> String;

/// Conventional `prefix:version:key` layout.
pub fn default_key_function(key: &str, prefix: &str, version: i64) -> String {
    format!("{}:{}:{}", prefix, version, key)
}

// == Key Encoder ==
/// Derives storage keys. Pure: equal inputs always give equal outputs.
#[derive(Clone)]
pub struct KeyEncoder {
    prefix: String,
    default_version: i64,
    key_function: KeyFunction,
}

impl KeyEncoder {
    // == Constructor ==
    /// Creates an encoder with the given namespace prefix and default version.
    pub fn new(prefix: impl Into<String>, default_version: i64) -> Self {
        Self {
            prefix: prefix.into(),
            default_version,
            key_function: default_key_function,
        }
    }

    /// Creates an encoder from the cache configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.key_prefix.clone(), config.default_version)
    }

    /// Replaces the pre-hash key layout.
    pub fn with_key_function(mut self, key_function: KeyFunction) -> Self {
        self.key_function = key_function;
        self
    }

    /// Version used when a caller passes none.
    pub fn default_version(&self) -> i64 {
        self.default_version
    }

    // == Make Key ==
    /// Returns the pre-hash key, so versioned and namespaced keys differ.
    pub fn make_key(&self, raw_key: &str, version: Option<i64>) -> String {
        let version = version.unwrap_or(self.default_version);
        (self.key_function)(raw_key, &self.prefix, version)
    }

    // == Encode ==
    /// Returns the 64-character lowercase hex SHA-256 of the pre-hash key.
    pub fn encode(&self, raw_key: &str, version: Option<i64>) -> Result<String> {
        if raw_key.is_empty() {
            return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
        }

        let digest = Sha256::digest(self.make_key(raw_key, version).as_bytes());
        Ok(hex::encode(digest))
    }
}

impl fmt::Debug for KeyEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEncoder")
            .field("prefix", &self.prefix)
            .field("default_version", &self.default_version)
            .finish_non_exhaustive()
    }
}

impl Default for KeyEncoder {
    fn default() -> Self {
        Self::new("", 1)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key_layout() {
        let encoder = KeyEncoder::new("app", 1);
        assert_eq!(encoder.make_key("session:42", Some(2)), "app:2:session:42");
        assert_eq!(encoder.make_key("session:42", None), "app:1:session:42");
    }

    #[test]
    fn test_encode_is_fixed_length_hex() {
        let encoder = KeyEncoder::default();
        let key = encoder.encode("some/key with spaces?", None).unwrap();

        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_encode_known_digest() {
        // sha256(":1:foo")
        let encoder = KeyEncoder::default();
        let expected = hex::encode(Sha256::digest(b":1:foo"));
        assert_eq!(encoder.encode("foo", None).unwrap(), expected);
    }

    #[test]
    fn test_encode_deterministic() {
        let encoder = KeyEncoder::new("app", 3);
        assert_eq!(
            encoder.encode("user:1", Some(2)).unwrap(),
            encoder.encode("user:1", Some(2)).unwrap()
        );
    }

    #[test]
    fn test_version_changes_key() {
        let encoder = KeyEncoder::default();
        assert_ne!(
            encoder.encode("user:1", Some(1)).unwrap(),
            encoder.encode("user:1", Some(2)).unwrap()
        );
    }

    #[test]
    fn test_prefix_changes_key() {
        let a = KeyEncoder::new("a", 1);
        let b = KeyEncoder::new("b", 1);
        assert_ne!(a.encode("k", None).unwrap(), b.encode("k", None).unwrap());
    }

    #[test]
    fn test_explicit_default_version_matches_none() {
        let encoder = KeyEncoder::new("", 7);
        assert_eq!(
            encoder.encode("k", None).unwrap(),
            encoder.encode("k", Some(7)).unwrap()
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        let encoder = KeyEncoder::default();
        assert!(matches!(encoder.encode("", None), Err(CacheError::InvalidKey(_))));
    }

    #[test]
    fn test_custom_key_function() {
        fn flat(key: &str, _prefix: &str, _version: i64) -> String {
            key.to_string()
        }

        let encoder = KeyEncoder::new("ignored", 9).with_key_function(flat);
        assert_eq!(encoder.make_key("k", Some(1)), "k");
        assert_eq!(
            encoder.encode("k", Some(1)).unwrap(),
            KeyEncoder::new("other", 2).with_key_function(flat).encode("k", None).unwrap()
        );
    }
}
