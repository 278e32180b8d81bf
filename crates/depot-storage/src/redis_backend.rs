//! Redis storage backend — the production default.
//!
//! Wraps the `redis` crate behind the [`StorageBackend`] trait. Records map
//! one-to-one onto Redis hashes, so a single-field write is atomic on the
//! server side. The connection is a [`ConnectionManager`], which multiplexes
//! and reconnects automatically; cloning it is cheap and every operation
//! clones its own handle.
//!
//! Record naming happens above this layer (in `depot-core`). This backend
//! treats record and field names as opaque UTF-8 strings.

use std::collections::HashMap;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::{StorageBackend, StorageError};

/// A storage backend backed by a Redis server.
///
/// Thread-safe and safe to share across async tasks.
///
/// # Examples
///
/// ```no_run
/// # use depot_storage::RedisBackend;
/// # #[tokio::main]
/// # async fn main() {
/// let backend = RedisBackend::connect("redis://127.0.0.1:6379").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    address: String,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connect to a Redis server at the given address (`redis://host:port`).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connect`] if the address is invalid or the
    /// initial connection cannot be established.
    pub async fn connect(address: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(address).map_err(|e| StorageError::Connect {
            address: address.to_owned(),
            reason: e.to_string(),
        })?;

        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StorageError::Connect {
                address: address.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            conn,
            address: address.to_owned(),
        })
    }

    /// Return the address this backend connects to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedisBackend {
    async fn hget(&self, record: &str, field: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn.clone();
        conn.hget(record, field)
            .await
            .map_err(|e| StorageError::Read {
                record: record.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn hset(&self, record: &str, field: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(record, field, value)
            .await
            .map_err(|e| StorageError::Write {
                record: record.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn hget_all(&self, record: &str) -> Result<HashMap<String, String>, StorageError> {
        let mut conn = self.conn.clone();
        conn.hgetall(record).await.map_err(|e| StorageError::Read {
            record: record.to_owned(),
            reason: e.to_string(),
        })
    }

    async fn delete(&self, record: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(record)
            .await
            .map_err(|e| StorageError::Delete {
                record: record.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn exists(&self, record: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn.clone();
        conn.exists(record).await.map_err(|e| StorageError::Read {
            record: record.to_owned(),
            reason: e.to_string(),
        })
    }
}
