//! Bucket Cache Module
//!
//! Cache operations composed from key encoding, the item envelope and an
//! object store. Expiry is evaluated on read; nothing runs in the background.

use std::collections::HashMap;
use std::pin::pin;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheItem, Clock, KeyEncoder, KeyFunction, SystemClock, Timeout};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::store::{object_keys, Fetched, ObjectStore};

// == Bucket Cache ==
/// Key/value cache stored in an object-storage bucket.
///
/// Holds no item state of its own, so one instance (or clones of it) can
/// serve any number of concurrent tasks. `add`, `touch`, `incr` and the
/// version moves are check-then-act sequences without locking: concurrent
/// callers on the same key can interleave and the last write wins.
pub struct BucketCache<S: ObjectStore + ?Sized> {
    /// Bucket client
    store: Arc<S>,
    /// Storage key derivation
    keys: KeyEncoder,
    /// Time source for expiry
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<S: ObjectStore + ?Sized> Clone for BucketCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<S: ObjectStore> BucketCache<S> {
    // == Constructor ==
    /// Creates a cache over `store` using the wall clock.
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }
}

impl<S: ObjectStore + ?Sized> BucketCache<S> {
    /// Creates a cache over a shared store.
    pub fn from_arc(store: Arc<S>, config: CacheConfig) -> Self {
        Self {
            store,
            keys: KeyEncoder::from_config(&config),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the pre-hash key layout.
    pub fn with_key_function(mut self, key_function: KeyFunction) -> Self {
        self.keys = self.keys.with_key_function(key_function);
        self
    }

    /// Returns the underlying object store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the object key an item is stored under.
    pub fn storage_key(&self, key: &str, version: Option<i64>) -> Result<String> {
        self.keys.encode(key, version)
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns None if the key is absent or expired. An expired item is
    /// deleted on the way out; failure to delete is logged, not returned.
    ///
    /// # Arguments
    /// * `key` - The logical cache key
    /// * `version` - Key version (uses the configured default if None)
    pub async fn get<T: DeserializeOwned>(&self, key: &str, version: Option<i64>) -> Result<Option<T>> {
        let storage_key = self.keys.encode(key, version)?;

        match self.fetch_live(&storage_key).await? {
            Some(item) => Ok(Some(item.into_typed(&storage_key)?.value)),
            None => Ok(None),
        }
    }

    /// Retrieves a value by key, falling back to `default` when absent.
    pub async fn get_or_default<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
        version: Option<i64>,
    ) -> Result<T> {
        Ok(self.get(key, version).await?.unwrap_or(default))
    }

    /// Returns true if the key holds an unexpired item.
    pub async fn has_key(&self, key: &str, version: Option<i64>) -> Result<bool> {
        Ok(self.get::<Value>(key, version).await?.is_some())
    }

    // == Set ==
    /// Stores a value, overwriting any existing item unconditionally.
    ///
    /// # Arguments
    /// * `key` - The logical cache key
    /// * `value` - Any value serializable as JSON
    /// * `timeout` - Lifetime of the item
    /// * `version` - Key version (uses the configured default if None)
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        timeout: Timeout,
        version: Option<i64>,
    ) -> Result<()> {
        let storage_key = self.keys.encode(key, version)?;
        let expiry = self.expiry_for(timeout);

        self.write(&storage_key, &CacheItem::new(value, expiry)).await
    }

    // == Add ==
    /// Stores a value only if the key is absent or expired.
    ///
    /// Returns true if the value was written. Not atomic: a concurrent writer
    /// between the read and the write can be overwritten.
    pub async fn add<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        timeout: Timeout,
        version: Option<i64>,
    ) -> Result<bool> {
        if self.get::<Value>(key, version).await?.is_some() {
            debug!(key, "Add skipped, key present");
            return Ok(false);
        }

        self.set(key, value, timeout, version).await?;
        Ok(true)
    }

    // == Get Or Set ==
    /// Returns the cached value, computing and adding `default` when absent.
    ///
    /// Reads again after adding so that a value added concurrently by another
    /// caller wins over the one computed here.
    pub async fn get_or_set<T, F>(
        &self,
        key: &str,
        default: F,
        timeout: Timeout,
        version: Option<i64>,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get(key, version).await? {
            return Ok(value);
        }

        let value = default();
        self.add(key, &value, timeout, version).await?;
        Ok(self.get(key, version).await?.unwrap_or(value))
    }

    // == Delete ==
    /// Removes an item. Deleting an absent key is not an error.
    pub async fn delete(&self, key: &str, version: Option<i64>) -> Result<()> {
        let storage_key = self.keys.encode(key, version)?;

        self.store.delete_object(&storage_key).await?;
        debug!(key = %storage_key, "Deleted item");
        Ok(())
    }

    // == Touch ==
    /// Sets a new expiry on an existing, unexpired item.
    ///
    /// Returns false without writing if the key is absent or expired. The
    /// whole envelope is rewritten since the store cannot update it in place.
    pub async fn touch(&self, key: &str, timeout: Timeout, version: Option<i64>) -> Result<bool> {
        let storage_key = self.keys.encode(key, version)?;

        let Some(mut item) = self.fetch_live(&storage_key).await? else {
            return Ok(false);
        };

        item.expiry = self.expiry_for(timeout);
        self.write(&storage_key, &item).await?;
        Ok(true)
    }

    // == Bulk Operations ==
    /// Retrieves several keys; absent and expired keys are left out.
    pub async fn get_many<K, T>(&self, keys: &[K], version: Option<i64>) -> Result<HashMap<String, T>>
    where
        K: AsRef<str>,
        T: DeserializeOwned,
    {
        let lookups = keys.iter().map(|key| async move {
            let key = key.as_ref();
            let value = self.get::<T>(key, version).await?;
            Ok::<_, CacheError>(value.map(|value| (key.to_string(), value)))
        });

        Ok(try_join_all(lookups).await?.into_iter().flatten().collect())
    }

    /// Stores several values with a shared timeout.
    pub async fn set_many<K, T, I>(&self, items: I, timeout: Timeout, version: Option<i64>) -> Result<()>
    where
        K: AsRef<str>,
        T: Serialize,
        I: IntoIterator<Item = (K, T)>,
    {
        for (key, value) in items {
            self.set(key.as_ref(), &value, timeout, version).await?;
        }
        Ok(())
    }

    /// Removes several keys using batch deletes.
    ///
    /// All keys are validated before any request is sent.
    pub async fn delete_many<K: AsRef<str>>(&self, keys: &[K], version: Option<i64>) -> Result<()> {
        let storage_keys = keys
            .iter()
            .map(|key| self.keys.encode(key.as_ref(), version))
            .collect::<Result<Vec<_>>>()?;

        for chunk in storage_keys.chunks(self.batch_limit()) {
            self.store.delete_objects(chunk).await?;
        }

        debug!(count = storage_keys.len(), "Deleted items");
        Ok(())
    }

    // == Clear ==
    /// Deletes every object in the bucket, not only this cache's keys.
    ///
    /// The bucket must be dedicated to the cache. Keys are streamed from the
    /// listing and removed in batches of at most `max_delete_batch`, so the
    /// full key set is never held in memory. Stops at the first failing
    /// request; batches already sent stay deleted. Returns the number of keys
    /// submitted for deletion.
    pub async fn clear(&self) -> Result<usize> {
        let limit = self.batch_limit();
        let mut keys = pin!(object_keys(self.store.as_ref()));
        let mut batch: Vec<String> = Vec::with_capacity(limit);
        let mut removed = 0;

        while let Some(key) = keys.try_next().await? {
            batch.push(key);

            // Flush once we hit the batch limit
            if batch.len() >= limit {
                self.store.delete_objects(&batch).await?;
                removed += batch.len();
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.store.delete_objects(&batch).await?;
            removed += batch.len();
        }

        info!(bucket = %self.config.bucket, removed, "Cleared cache bucket");
        Ok(removed)
    }

    // == Arithmetic ==
    /// Adds `delta` to an integer value, keeping its expiry.
    ///
    /// Fails with `Missing` if the key is absent or expired.
    pub async fn incr(&self, key: &str, delta: i64, version: Option<i64>) -> Result<i64> {
        let storage_key = self.keys.encode(key, version)?;

        let Some(item) = self.fetch_live(&storage_key).await? else {
            return Err(CacheError::Missing(key.to_string()));
        };

        let current = item
            .value
            .as_i64()
            .ok_or_else(|| CacheError::NotAnInteger(key.to_string()))?;
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;

        self.write(&storage_key, &CacheItem::new(updated, item.expiry))
            .await?;
        Ok(updated)
    }

    /// Subtracts `delta` from an integer value, keeping its expiry.
    pub async fn decr(&self, key: &str, delta: i64, version: Option<i64>) -> Result<i64> {
        let negated = delta
            .checked_neg()
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        self.incr(key, negated, version).await
    }

    // == Versioning ==
    /// Moves an item from `version` to `version + delta`, returning the new version.
    ///
    /// The item keeps its value and expiry; the old version is deleted.
    pub async fn incr_version(&self, key: &str, delta: i64, version: Option<i64>) -> Result<i64> {
        let from = version.unwrap_or(self.keys.default_version());
        let to = from
            .checked_add(delta)
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;

        let old_key = self.keys.encode(key, Some(from))?;
        let Some(item) = self.fetch_live(&old_key).await? else {
            return Err(CacheError::Missing(key.to_string()));
        };

        // A zero delta, or a key function that ignores the version, maps
        // both versions to one object
        let new_key = self.keys.encode(key, Some(to))?;
        if new_key == old_key {
            return Ok(to);
        }

        self.write(&new_key, &item).await?;
        self.store.delete_object(&old_key).await?;

        debug!(from, to, "Moved item to new version");
        Ok(to)
    }

    /// Moves an item from `version` to `version - delta`, returning the new version.
    pub async fn decr_version(&self, key: &str, delta: i64, version: Option<i64>) -> Result<i64> {
        let negated = delta
            .checked_neg()
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        self.incr_version(key, negated, version).await
    }

    // == Internals ==
    /// Reads and decodes an item, treating expired items as absent.
    async fn fetch_live(&self, storage_key: &str) -> Result<Option<CacheItem>> {
        let bytes = match self.store.get_object(storage_key).await? {
            Fetched::Found(bytes) => bytes,
            Fetched::NotFound => {
                debug!(key = %storage_key, "Cache miss");
                return Ok(None);
            }
        };

        let item = CacheItem::<Value>::decode(storage_key, &bytes)?;
        if item.is_expired_at(self.clock.timestamp()) {
            debug!(key = %storage_key, expiry = ?item.expiry, "Item expired");
            self.discard_expired(storage_key).await;
            return Ok(None);
        }

        Ok(Some(item))
    }

    /// Best-effort removal of an expired item.
    async fn discard_expired(&self, storage_key: &str) {
        if let Err(e) = self.store.delete_object(storage_key).await {
            warn!(key = %storage_key, error = %e, "Failed to delete expired item");
        }
    }

    async fn write<T: Serialize>(&self, storage_key: &str, item: &CacheItem<T>) -> Result<()> {
        let body = item.encode()?;
        self.store.put_object(storage_key, body).await?;
        debug!(
            key = %storage_key,
            expiry = ?item.expiry,
            ttl = ?item.ttl_remaining(self.clock.timestamp()),
            "Stored item"
        );
        Ok(())
    }

    fn expiry_for(&self, timeout: Timeout) -> Option<f64> {
        timeout.expiry_from(self.clock.timestamp(), self.config.default_timeout)
    }

    fn batch_limit(&self) -> usize {
        self.config
            .max_delete_batch
            .min(self.store.max_delete_batch())
            .max(1)
    }
}
