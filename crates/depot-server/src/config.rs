//! Server configuration for Depot.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `DEPOT_*` environment variables. The
//! config is read once at startup and treated as immutable for the process
//! lifetime; components receive the values they need at construction.

use std::net::SocketAddr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Record name prefix inside the storage backend.
    pub storage_prefix: String,
    /// Public base URL returned to clients at deployment creation.
    pub public_url: String,
    /// Base URL of the external identity directory.
    pub auth_url: String,
    /// Whether callers without a credential get the anonymous identity.
    pub allow_anonymous: bool,
    /// Symmetric secret for signing or encrypting capability tokens.
    pub token_secret: String,
    /// Which token codec to run.
    pub token_codec: TokenCodecKind,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// Redis at the given address.
    Redis { address: String },
}

/// Which capability token codec the server runs.
///
/// Exactly one codec is active per process; tokens issued by one codec are
/// rejected by the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCodecKind {
    /// Stateless signed JWT with deployment scope and 24h expiry.
    SignedClaims,
    /// Reversible encryption of the caller's identity.
    OpaqueEncrypted,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on (binds to `0.0.0.0`)
    /// - `DEPOT_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:8300`)
    /// - `DEPOT_STORAGE` — `memory` or `redis` (default: `memory`)
    /// - `DEPOT_REDIS_ADDR` — Redis address (default: `redis://127.0.0.1:6379`)
    /// - `DEPOT_STORAGE_PREFIX` — record name prefix (default: `depot`)
    /// - `DEPOT_PUBLIC_URL` — base URL handed to clients (default: derived from bind address)
    /// - `DEPOT_AUTH_URL` — identity directory base URL (default: `http://127.0.0.1:8100`)
    /// - `DEPOT_ALLOW_ANONYMOUS` — accept callers without a credential (default: `false`)
    /// - `DEPOT_TOKEN_SECRET` — token signing/encryption secret
    /// - `DEPOT_TOKEN_CODEC` — `signed` or `opaque` (default: `signed`)
    /// - `DEPOT_LOG_LEVEL` — log filter (default: `info`)
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = if let Ok(addr) = std::env::var("DEPOT_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8300)))
        } else if let Ok(port_str) = std::env::var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(8300);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 8300))
        };

        let storage_backend = match std::env::var("DEPOT_STORAGE")
            .unwrap_or_else(|_| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "redis" => StorageBackendType::Redis {
                address: std::env::var("DEPOT_REDIS_ADDR")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_owned()),
            },
            _ => StorageBackendType::Memory,
        };

        let storage_prefix =
            std::env::var("DEPOT_STORAGE_PREFIX").unwrap_or_else(|_| "depot".to_owned());

        let public_url = std::env::var("DEPOT_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{bind_addr}"));

        let auth_url = std::env::var("DEPOT_AUTH_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8100".to_owned());

        let allow_anonymous = std::env::var("DEPOT_ALLOW_ANONYMOUS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let token_secret =
            std::env::var("DEPOT_TOKEN_SECRET").unwrap_or_else(|_| "depot-dev-secret".to_owned());

        let token_codec = match std::env::var("DEPOT_TOKEN_CODEC")
            .unwrap_or_else(|_| "signed".to_owned())
            .to_lowercase()
            .as_str()
        {
            "opaque" => TokenCodecKind::OpaqueEncrypted,
            _ => TokenCodecKind::SignedClaims,
        };

        let log_level = std::env::var("DEPOT_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());

        Self {
            bind_addr,
            storage_backend,
            storage_prefix,
            public_url,
            auth_url,
            allow_anonymous,
            token_secret,
            token_codec,
            log_level,
        }
    }
}
