//! Depot server entry point.
//!
//! Bootstraps the storage backend and the deployment service, then starts
//! the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use depot_core::deployment::DeploymentStore;
use depot_core::identity::IdentityResolver;
use depot_core::service::DeploymentService;
use depot_core::token::{OpaqueCodec, SignedClaimsCodec, TokenCodec};
use depot_storage::MemoryBackend;

use depot_server::config::{ServerConfig, StorageBackendType, TokenCodecKind};
use depot_server::routes;
use depot_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment.
    let config = ServerConfig::from_env();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = ?config.storage_backend, codec = ?config.token_codec, "Depot starting");

    let state = build_app_state(&config).await?;
    let app = build_router(state);

    // Bind and serve.
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Depot server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Depot server stopped");
    Ok(())
}

/// Build the shared application state.
async fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    // Bootstrap storage backend.
    let backend: Arc<dyn depot_storage::StorageBackend> = match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            Arc::new(MemoryBackend::new())
        }
        #[cfg(feature = "redis-backend")]
        StorageBackendType::Redis { address } => {
            info!(address = %address, "using Redis storage");
            Arc::new(
                depot_storage::RedisBackend::connect(address)
                    .await
                    .context("failed to connect to Redis storage")?,
            )
        }
        #[cfg(not(feature = "redis-backend"))]
        StorageBackendType::Redis { .. } => {
            anyhow::bail!("Redis backend requested but feature 'redis-backend' is not enabled");
        }
    };

    let store = DeploymentStore::new(backend, config.storage_prefix.clone());
    let resolver = IdentityResolver::new(config.auth_url.clone(), config.allow_anonymous);

    // Exactly one token codec runs per process; tokens from the other
    // variant are rejected as invalid.
    let codec: Arc<dyn TokenCodec> = match config.token_codec {
        TokenCodecKind::SignedClaims => Arc::new(SignedClaimsCodec::new(&config.token_secret)),
        TokenCodecKind::OpaqueEncrypted => Arc::new(OpaqueCodec::new(&config.token_secret)),
    };

    let service = DeploymentService::new(resolver, codec, store);

    Ok(Arc::new(AppState {
        service,
        public_url: config.public_url.clone(),
    }))
}

/// Build the Axum router with all routes and middleware.
fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderName::from_static("x-api-key"),
            axum::http::HeaderName::from_static("x-api-ns"),
        ]);

    routes::store::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
