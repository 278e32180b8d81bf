//! In-memory storage backend for testing.
//!
//! Records live in a `BTreeMap` behind a `RwLock`. Nothing is persistent;
//! all data is lost when the process exits. Use this for unit tests and
//! integration tests where you need a real storage backend without a Redis
//! server.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{StorageBackend, StorageError};

/// An in-memory storage backend.
///
/// Thread-safe and async-compatible. Cloning shares the underlying data.
///
/// # Examples
///
/// ```
/// # use depot_storage::{MemoryBackend, StorageBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// backend.hset("depot:depl:abc", "data:host", "10.0.0.1").await.unwrap();
/// let val = backend.hget("depot:depl:abc", "data:host").await.unwrap();
/// assert_eq!(val, Some("10.0.0.1".to_owned()));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    records: Arc<RwLock<BTreeMap<String, BTreeMap<String, String>>>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    async fn hget(&self, record: &str, field: &str) -> Result<Option<String>, StorageError> {
        let records = self.records.read().await;
        Ok(records.get(record).and_then(|r| r.get(field)).cloned())
    }

    async fn hset(&self, record: &str, field: &str, value: &str) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records
            .entry(record.to_owned())
            .or_default()
            .insert(field.to_owned(), value.to_owned());
        Ok(())
    }

    async fn hget_all(&self, record: &str) -> Result<HashMap<String, String>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .get(record)
            .map(|r| r.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, record: &str) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        records.remove(record);
        Ok(())
    }

    async fn exists(&self, record: &str) -> Result<bool, StorageError> {
        let records = self.records.read().await;
        Ok(records.contains_key(record))
    }
}
