//! Storage backend abstraction for Depot.
//!
//! This crate defines the [`StorageBackend`] trait — a hash-record storage
//! interface that knows nothing about deployments, tokens, or access control.
//! A record is a named bag of string fields (the shape of a Redis hash); the
//! deployment layer in `depot-core` decides how records and fields are named.
//!
//! Two implementations are provided:
//!
//! - [`RedisBackend`] — production default, backed by Redis (feature `redis-backend`)
//! - [`MemoryBackend`] — in-memory, for testing only

mod error;
mod memory;
#[cfg(feature = "redis-backend")]
mod redis_backend;

pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisBackend;

use std::collections::HashMap;

/// A pluggable hash-record storage backend.
///
/// Records are addressed by UTF-8 names using `:` as a separator
/// (e.g. `depot:depl:4cfe…`). Each record holds string fields; a single
/// field write is atomic, multi-field writes are not.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Retrieve one field of a record.
    ///
    /// Returns `Ok(None)` if the record or the field does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn hget(&self, record: &str, field: &str) -> Result<Option<String>, StorageError>;

    /// Write one field of a record, overwriting any existing value.
    ///
    /// Creates the record if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn hset(&self, record: &str, field: &str, value: &str) -> Result<(), StorageError>;

    /// Retrieve all fields of a record.
    ///
    /// Returns an empty map if the record does not exist; absence of a
    /// record and an empty record are indistinguishable at this layer.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn hget_all(&self, record: &str) -> Result<HashMap<String, String>, StorageError>;

    /// Delete an entire record with all its fields. Idempotent: deleting a
    /// non-existent record is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the underlying backend fails.
    async fn delete(&self, record: &str) -> Result<(), StorageError>;

    /// Check whether a record exists (has at least one field).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn exists(&self, record: &str) -> Result<bool, StorageError> {
        Ok(!self.hget_all(record).await?.is_empty())
    }
}
