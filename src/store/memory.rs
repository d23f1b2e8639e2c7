//! Memory Store Module
//!
//! In-process object store with bucket-like paging and batch limits.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Fetched, ListPage, ObjectStore, StoreError, StoreResult, MAX_DELETE_BATCH};

/// Default number of keys per listing page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

// == Call Stats ==
/// Number of requests each store operation has served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
    pub put_object: usize,
    pub get_object: usize,
    pub delete_object: usize,
    pub list_objects: usize,
    pub delete_objects: usize,
}

#[derive(Debug, Default)]
struct CallCounters {
    put_object: AtomicUsize,
    get_object: AtomicUsize,
    delete_object: AtomicUsize,
    list_objects: AtomicUsize,
    delete_objects: AtomicUsize,
}

impl CallCounters {
    fn snapshot(&self) -> CallStats {
        CallStats {
            put_object: self.put_object.load(Ordering::Relaxed),
            get_object: self.get_object.load(Ordering::Relaxed),
            delete_object: self.delete_object.load(Ordering::Relaxed),
            list_objects: self.list_objects.load(Ordering::Relaxed),
            delete_objects: self.delete_objects.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Put,
    Get,
    Delete,
    List,
    DeleteMany,
}

// == Memory Store ==
/// Object store held in process memory.
///
/// Keys list in lexicographic order, continuation tokens are the last key of
/// the previous page, and batch deletes above the limit are rejected, so the
/// cache sees the same paging behavior it would against a real bucket.
/// Failures can be queued per operation to exercise error paths.
#[derive(Debug)]
pub struct MemoryStore {
    /// Object bodies by key
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    /// Keys returned per listing page
    page_size: usize,
    /// Keys accepted per batch delete
    max_delete_batch: usize,
    counters: CallCounters,
    /// Sizes of every accepted batch delete, in call order
    batches: Mutex<Vec<usize>>,
    /// One-shot failures keyed by operation
    faults: Mutex<HashMap<Op, StoreError>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store with bucket-default paging and batch limits.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            max_delete_batch: MAX_DELETE_BATCH,
            counters: CallCounters::default(),
            batches: Mutex::new(Vec::new()),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the number of keys per listing page (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the batch delete limit (minimum 1).
    pub fn with_max_delete_batch(mut self, max: usize) -> Self {
        self.max_delete_batch = max.max(1);
        self
    }

    // == Inspection ==
    /// Returns the number of objects held.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Returns true if no objects are held.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Returns true if an object exists under `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    /// Returns a copy of the raw body under `key`.
    pub async fn body(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    /// Returns per-operation request counts.
    pub fn calls(&self) -> CallStats {
        self.counters.snapshot()
    }

    /// Returns the size of each accepted batch delete, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // == Fault Injection ==
    /// Makes the next `put_object` fail with `err`.
    pub fn fail_next_put(&self, err: StoreError) {
        self.queue_fault(Op::Put, err);
    }

    /// Makes the next `get_object` fail with `err`.
    pub fn fail_next_get(&self, err: StoreError) {
        self.queue_fault(Op::Get, err);
    }

    /// Makes the next `delete_object` fail with `err`.
    pub fn fail_next_delete(&self, err: StoreError) {
        self.queue_fault(Op::Delete, err);
    }

    /// Makes the next `list_objects` fail with `err`.
    pub fn fail_next_list(&self, err: StoreError) {
        self.queue_fault(Op::List, err);
    }

    /// Makes the next `delete_objects` fail with `err`.
    pub fn fail_next_delete_objects(&self, err: StoreError) {
        self.queue_fault(Op::DeleteMany, err);
    }

    fn queue_fault(&self, op: Op, err: StoreError) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op, err);
    }

    fn take_fault(&self, op: Op) -> StoreResult<()> {
        match self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> StoreResult<()> {
        self.counters.put_object.fetch_add(1, Ordering::Relaxed);
        self.take_fault(Op::Put)?;

        self.objects.write().await.insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StoreResult<Fetched> {
        self.counters.get_object.fetch_add(1, Ordering::Relaxed);
        self.take_fault(Op::Get)?;

        match self.objects.read().await.get(key) {
            Some(body) => Ok(Fetched::Found(body.clone())),
            None => Ok(Fetched::NotFound),
        }
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        self.counters.delete_object.fetch_add(1, Ordering::Relaxed);
        self.take_fault(Op::Delete)?;

        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list_objects(&self, continuation: Option<String>) -> StoreResult<ListPage> {
        self.counters.list_objects.fetch_add(1, Ordering::Relaxed);
        self.take_fault(Op::List)?;

        let objects = self.objects.read().await;
        let lower = match continuation {
            Some(token) => Bound::Excluded(token),
            None => Bound::Unbounded,
        };

        // One extra key tells us whether another page follows
        let mut keys: Vec<String> = objects
            .range((lower, Bound::Unbounded))
            .take(self.page_size + 1)
            .map(|(key, _)| key.clone())
            .collect();

        let next_continuation = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };

        debug!(
            count = keys.len(),
            more = next_continuation.is_some(),
            "Listed page"
        );
        Ok(ListPage {
            keys,
            next_continuation,
        })
    }

    async fn delete_objects(&self, keys: &[String]) -> StoreResult<()> {
        self.counters.delete_objects.fetch_add(1, Ordering::Relaxed);
        self.take_fault(Op::DeleteMany)?;

        if keys.len() > self.max_delete_batch {
            return Err(StoreError::BatchRejected(keys.to_vec()));
        }

        {
            let mut objects = self.objects.write().await;
            for key in keys {
                objects.remove(key);
            }
        }

        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(keys.len());
        Ok(())
    }

    fn max_delete_batch(&self) -> usize {
        self.max_delete_batch
    }
}
