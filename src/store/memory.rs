//! In-memory object store
//!
//! Behaves like a single S3 account: objects live in a concurrent map keyed
//! by `(bucket, key)`, deleting a missing key succeeds, and HEAD on a
//! missing key reports `NotFound`. Failures can be injected per key so the
//! gateway's error paths are testable without a network.

use super::{ObjectBody, ObjectStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Per-operation call counters
#[derive(Debug, Default)]
struct CallCounts {
    put: AtomicUsize,
    head: AtomicUsize,
    delete: AtomicUsize,
    list_buckets: AtomicUsize,
}

/// In-memory [`ObjectStore`] implementation
#[derive(Debug)]
pub struct InMemoryStore {
    objects: DashMap<(String, String), Bytes>,
    buckets: RwLock<HashSet<String>>,
    failing_keys: RwLock<Vec<String>>,
    reachable: AtomicBool,
    calls: CallCounts,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            buckets: RwLock::new(HashSet::new()),
            failing_keys: RwLock::new(Vec::new()),
            reachable: AtomicBool::new(true),
            calls: CallCounts::default(),
        }
    }

    /// Create a store that already knows about `bucket`
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store.buckets.write().insert(bucket.to_string());
        store
    }

    /// Make every `put` whose key contains `pattern` fail
    pub fn fail_puts_matching(&self, pattern: &str) {
        self.failing_keys.write().push(pattern.to_string());
    }

    /// Toggle reachability; an unreachable store fails every operation
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Stored object contents, if present
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of stored objects across all buckets
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn put_calls(&self) -> usize {
        self.calls.put.load(Ordering::SeqCst)
    }

    pub fn head_calls(&self) -> usize {
        self.calls.head.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    pub fn list_buckets_calls(&self) -> usize {
        self.calls.list_buckets.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Service(
                "RequestError: send request failed: connection refused".into(),
            ))
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(&self, bucket: &str, key: &str, body: ObjectBody) -> Result<(), StoreError> {
        self.calls.put.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        if self
            .failing_keys
            .read()
            .iter()
            .any(|pattern| key.contains(pattern.as_str()))
        {
            return Err(StoreError::Service(format!(
                "InternalError: We encountered an internal error storing '{}'",
                key
            )));
        }

        let data = body
            .into_bytes()
            .await
            .map_err(|e| StoreError::Body(e.to_string()))?;

        self.buckets.write().insert(bucket.to_string());
        self.objects
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.calls.head.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        if self
            .objects
            .contains_key(&(bucket.to_string(), key.to_string()))
        {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        self.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        self.calls.list_buckets.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let mut names: Vec<String> = self.buckets.read().iter().cloned().collect();
        names.sort();
        Ok(names)
    }
}
