//! Storage error types.
//!
//! Every error variant carries enough context to diagnose the problem
//! without a debugger: the record name and the backend's reason, never
//! stored values.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to connect to the storage backend.
    #[error("failed to connect to storage at '{address}': {reason}")]
    Connect { address: String, reason: String },

    /// Failed to read from a record.
    #[error("failed to read record '{record}': {reason}")]
    Read { record: String, reason: String },

    /// Failed to write a field of a record.
    #[error("failed to write record '{record}': {reason}")]
    Write { record: String, reason: String },

    /// Failed to delete a record.
    #[error("failed to delete record '{record}': {reason}")]
    Delete { record: String, reason: String },
}
