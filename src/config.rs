//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;

use crate::store::MAX_DELETE_BATCH;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Store credentials and region belong to the store client, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Bucket the cache writes to; must be dedicated to the cache
    pub bucket: String,
    /// Namespace prepended to every key before hashing
    pub key_prefix: String,
    /// Version used when a caller passes none
    pub default_version: i64,
    /// Default timeout in seconds, None = never expire
    pub default_timeout: Option<i64>,
    /// Keys per batch delete during clear
    pub max_delete_batch: usize,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BUCKET` - Bucket name (default: empty)
    /// - `CACHE_KEY_PREFIX` - Key namespace (default: empty)
    /// - `CACHE_DEFAULT_VERSION` - Default key version (default: 1)
    /// - `CACHE_DEFAULT_TIMEOUT` - Seconds, or `none` to never expire (default: 300)
    /// - `CACHE_MAX_DELETE_BATCH` - Batch delete size, 1..=1000 (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bucket: env::var("CACHE_BUCKET").unwrap_or(defaults.bucket),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            default_version: env::var("CACHE_DEFAULT_VERSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_version),
            default_timeout: env::var("CACHE_DEFAULT_TIMEOUT")
                .ok()
                .and_then(|v| parse_timeout(&v))
                .unwrap_or(defaults.default_timeout),
            max_delete_batch: env::var("CACHE_MAX_DELETE_BATCH")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(clamp_batch)
                .unwrap_or(defaults.max_delete_batch),
        }
    }

    /// Creates a default configuration for `bucket`.
    pub fn for_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_default_version(mut self, version: i64) -> Self {
        self.default_version = version;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Option<i64>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_delete_batch(mut self, max: usize) -> Self {
        self.max_delete_batch = clamp_batch(max);
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key_prefix: String::new(),
            default_version: 1,
            default_timeout: Some(300),
            max_delete_batch: MAX_DELETE_BATCH,
        }
    }
}

/// Parses a timeout setting; `none` means never expire.
fn parse_timeout(raw: &str) -> Option<Option<i64>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    raw.parse().ok().map(Some)
}

fn clamp_batch(max: usize) -> usize {
    max.clamp(1, MAX_DELETE_BATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.bucket, "");
        assert_eq!(config.key_prefix, "");
        assert_eq!(config.default_version, 1);
        assert_eq!(config.default_timeout, Some(300));
        assert_eq!(config.max_delete_batch, 1000);
    }

    // Single test owns the environment so parallel tests don't race on it
    #[test]
    fn test_config_from_env() {
        env::remove_var("CACHE_BUCKET");
        env::remove_var("CACHE_KEY_PREFIX");
        env::remove_var("CACHE_DEFAULT_VERSION");
        env::remove_var("CACHE_DEFAULT_TIMEOUT");
        env::remove_var("CACHE_MAX_DELETE_BATCH");
        assert_eq!(CacheConfig::from_env(), CacheConfig::default());

        env::set_var("CACHE_BUCKET", "my-cache-bucket");
        env::set_var("CACHE_KEY_PREFIX", "app");
        env::set_var("CACHE_DEFAULT_VERSION", "4");
        env::set_var("CACHE_DEFAULT_TIMEOUT", "none");
        env::set_var("CACHE_MAX_DELETE_BATCH", "5000");
        let config = CacheConfig::from_env();
        assert_eq!(config.bucket, "my-cache-bucket");
        assert_eq!(config.key_prefix, "app");
        assert_eq!(config.default_version, 4);
        assert_eq!(config.default_timeout, None);
        assert_eq!(config.max_delete_batch, 1000);

        env::set_var("CACHE_DEFAULT_VERSION", "not-a-number");
        env::set_var("CACHE_DEFAULT_TIMEOUT", "60");
        let config = CacheConfig::from_env();
        assert_eq!(config.default_version, 1);
        assert_eq!(config.default_timeout, Some(60));

        for var in [
            "CACHE_BUCKET",
            "CACHE_KEY_PREFIX",
            "CACHE_DEFAULT_VERSION",
            "CACHE_DEFAULT_TIMEOUT",
            "CACHE_MAX_DELETE_BATCH",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("None"), Some(None));
        assert_eq!(parse_timeout(" 30 "), Some(Some(30)));
        assert_eq!(parse_timeout("-1"), Some(Some(-1)));
        assert_eq!(parse_timeout("soon"), None);
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::for_bucket("b")
            .with_key_prefix("p")
            .with_default_version(2)
            .with_default_timeout(None)
            .with_max_delete_batch(0);
        assert_eq!(config.bucket, "b");
        assert_eq!(config.key_prefix, "p");
        assert_eq!(config.default_version, 2);
        assert_eq!(config.default_timeout, None);
        assert_eq!(config.max_delete_batch, 1);
    }
}
