//! The deployment store.
//!
//! A deployment is one hash record in the storage backend, named
//! `<prefix>:depl:<id>`. Inside the record, user data fields live under
//! `data:<key>` and bookkeeping under `meta:*`. The two namespaces are
//! disjoint, so a caller can never overwrite ownership or timestamps by
//! picking an unlucky key name.
//!
//! There are no cross-field transactions: every field write is atomic on
//! its own, concurrent writes to the same key are last-writer-wins.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use depot_storage::StorageBackend;

/// Metadata field: uid of the creating identity. Set exactly once.
const META_OWNER: &str = "meta:owner";
/// Metadata field: optional namespace the deployment belongs to.
const META_NAMESPACE: &str = "meta:namespace";
/// Metadata field: creation time, unix seconds.
const META_CREATED: &str = "meta:created_at";
/// Metadata field: last update time, unix seconds.
const META_UPDATED: &str = "meta:updated_at";
/// Field prefix for user data keys.
const DATA_PREFIX: &str = "data:";

/// Namespaced access to deployment records in a storage backend.
///
/// Cloning is cheap; clones share the backend handle.
#[derive(Clone)]
pub struct DeploymentStore {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
}

impl std::fmt::Debug for DeploymentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl DeploymentStore {
    /// Create a store over `backend`, scoping every record under `prefix`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    fn record(&self, id: &str) -> String {
        format!("{}:depl:{}", self.prefix, id)
    }

    /// Create a new deployment owned by `owner` and return its id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::IdCollision`] if the freshly generated id already
    ///   exists (practically never with random ids).
    /// - [`StoreError::Backend`] if a write fails.
    pub async fn create(
        &self,
        owner: &str,
        namespace: Option<&str>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let record = self.record(&id);

        if self.backend.exists(&record).await? {
            return Err(StoreError::IdCollision { id });
        }

        self.backend.hset(&record, META_OWNER, owner).await?;
        if let Some(ns) = namespace {
            self.backend.hset(&record, META_NAMESPACE, ns).await?;
        }
        let now = Utc::now().timestamp().to_string();
        self.backend.hset(&record, META_CREATED, &now).await?;

        info!(deployment = %id, owner = %owner, "deployment created");
        Ok(id)
    }

    /// The recorded owner uid, or `None` if the deployment does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the read fails.
    pub async fn owner(&self, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.backend.hget(&self.record(id), META_OWNER).await?)
    }

    /// Set one data field and bump the update timestamp.
    ///
    /// The timestamp and the field are two independent writes; a concurrent
    /// reader may observe one without the other.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the deployment does not exist.
    /// - [`StoreError::Backend`] if a write fails.
    pub async fn set_field(&self, id: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let record = self.record(id);
        if !self.backend.exists(&record).await? {
            return Err(StoreError::NotFound);
        }

        let now = Utc::now().timestamp().to_string();
        self.backend.hset(&record, META_UPDATED, &now).await?;
        self.backend
            .hset(&record, &format!("{DATA_PREFIX}{key}"), value)
            .await?;
        Ok(())
    }

    /// Read one data field.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the deployment or the field is absent,
    ///   or the stored value is empty.
    /// - [`StoreError::Backend`] if the read fails.
    pub async fn get_field(&self, id: &str, key: &str) -> Result<String, StoreError> {
        let value = self
            .backend
            .hget(&self.record(id), &format!("{DATA_PREFIX}{key}"))
            .await?;
        match value {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(StoreError::NotFound),
        }
    }

    /// List data fields, optionally restricted to keys starting with
    /// `filter`. Metadata is never included.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the deployment does not exist.
    /// - [`StoreError::Backend`] if the read fails.
    pub async fn list_fields(
        &self,
        id: &str,
        filter: Option<&str>,
    ) -> Result<HashMap<String, String>, StoreError> {
        let all = self.backend.hget_all(&self.record(id)).await?;
        if all.is_empty() {
            return Err(StoreError::NotFound);
        }

        Ok(all
            .into_iter()
            .filter_map(|(field, value)| {
                field
                    .strip_prefix(DATA_PREFIX)
                    .map(|key| (key.to_owned(), value))
            })
            .filter(|(key, _)| filter.is_none_or(|f| key.starts_with(f)))
            .collect())
    }

    /// Delete the whole deployment record. Idempotent: deleting an id that
    /// does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.backend.delete(&self.record(id)).await?;
        info!(deployment = %id, "deployment deleted");
        Ok(())
    }
}
