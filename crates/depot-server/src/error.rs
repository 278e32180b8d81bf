//! HTTP error types for the Depot server.
//!
//! Maps domain errors from `depot-core` into HTTP responses. Every error
//! produces a JSON body with a human-readable `message` field, the shape
//! every client of this API expects on failure.
//!
//! Status mapping: authorization failures are 403, missing deployments and
//! fields are 404, everything else (including a malformed request body) is
//! 500. Authorization failures are never retried server-side.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use depot_core::error::{ServiceError, StoreError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Authentication or authorization failed.
    Forbidden(String),
    /// Requested deployment or field not found.
    NotFound(String),
    /// Store failure or malformed request.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, axum::Json(ErrorBody { message })).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Auth(inner) => Self::Forbidden(format!("Auth error: {inner}")),
            ServiceError::NotAuthorized => Self::Forbidden("not authorized".to_owned()),
            ServiceError::Store(StoreError::NotFound) => Self::NotFound("not found".to_owned()),
            ServiceError::Store(inner) => Self::Internal(inner.to_string()),
        }
    }
}
