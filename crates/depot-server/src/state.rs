//! Shared application state for the Depot server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use depot_core::service::DeploymentService;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// The deployment service, the only entry point into the core.
    pub service: DeploymentService,
    /// Public base URL returned to clients at deployment creation.
    pub public_url: String,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}
