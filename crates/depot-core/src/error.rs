//! Error types for `depot-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Auth errors never include credential or token bytes, only
//! the reason for rejection.

use depot_storage::StorageError;

/// Errors from credential resolution and token handling.
///
/// Every variant maps to an authorization failure at the HTTP boundary;
/// callers must never distinguish them into anything weaker than a denial.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential was presented and anonymous access is disabled.
    #[error("no credential provided")]
    MissingCredential,

    /// The API key was rejected. A directory outage or a malformed directory
    /// response is reported identically to a genuinely bad key.
    #[error("invalid credential: {reason}")]
    InvalidCredential { reason: String },

    /// Token issuance failed (claims serialization or encryption).
    #[error("failed to issue token: {reason}")]
    TokenIssue { reason: String },

    /// The token failed verification (bad signature, corrupted bytes, wrong
    /// key, or malformed encoding).
    #[error("invalid token: {reason}")]
    InvalidToken { reason: String },

    /// The token's expiry is in the past.
    #[error("token expired")]
    TokenExpired,

    /// The token was issued for a different purpose.
    #[error("token audience mismatch")]
    WrongAudience,
}

/// Errors from deployment store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The deployment or the requested field does not exist.
    #[error("not found")]
    NotFound,

    /// A freshly generated deployment id already exists in storage.
    #[error("deployment id collision: {id}")]
    IdCollision { id: String },

    /// The underlying storage backend returned an error.
    #[error("storage error: {0}")]
    Backend(#[from] StorageError),
}

/// Errors surfaced by [`DeploymentService`](crate::service::DeploymentService)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Credential resolution or token issuance failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The authorization gate denied the operation.
    #[error("not authorized")]
    NotAuthorized,

    /// The deployment store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// Ciphertext is too short to contain a valid nonce + tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },
}
