//! Deployment store routes: `/store`.
//!
//! Paths:
//! - `GET    /store` — liveness/version
//! - `POST   /store` — create a deployment, returns its capability token
//! - `GET    /store/{deployment}` — list fields, optional `?filter=<prefix>`
//! - `PUT    /store/{deployment}` — set one field
//! - `DELETE /store/{deployment}` — delete the deployment
//! - `GET    /store/{deployment}/{key}` — read one field
//!
//! Credentials ride in headers: `X-API-Key` (plus optional `X-API-NS` on
//! create) and `Authorization: Bearer <token>`. Each guarded handler hands
//! both to the service, which runs the authorization gate exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;
use depot_core::service::Credentials;

/// Build the `/store` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/store", get(home).post(create_deployment))
        .route(
            "/store/{deployment}",
            get(list_fields).put(update_field).delete(delete_deployment),
        )
        .route("/store/{deployment}/{key}", get(get_field))
}

/// Pull credentials out of the request headers.
fn credentials(headers: &HeaderMap) -> Credentials {
    Credentials {
        api_key: header_value(headers, "x-api-key"),
        bearer: header_value(headers, "authorization"),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub version: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    /// Public base URL of this server, for clients that were handed only a
    /// service-registry name.
    pub url: String,
    pub id: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub deployment: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct FieldResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Body of `PUT /store/{deployment}`.
#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Liveness and version probe.
async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        version: env!("CARGO_PKG_VERSION"),
        message: "ok",
    })
}

/// Create a deployment and issue its capability token.
async fn create_deployment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CreateResponse>, AppError> {
    let api_key = header_value(&headers, "x-api-key").unwrap_or_default();
    let namespace = header_value(&headers, "x-api-ns");

    let created = state
        .service
        .create(&api_key, namespace.as_deref())
        .await?;

    Ok(Json(CreateResponse {
        url: state.public_url.clone(),
        id: created.id,
        token: created.token,
    }))
}

/// List a deployment's fields, optionally filtered by key prefix.
async fn list_fields(
    State(state): State<Arc<AppState>>,
    Path(deployment): Path<String>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Json<FieldsResponse>, AppError> {
    let fields = state
        .service
        .list_fields(&credentials(&headers), &deployment, query.filter.as_deref())
        .await?;

    Ok(Json(FieldsResponse { deployment: fields }))
}

/// Set one field of a deployment.
async fn update_field(
    State(state): State<Arc<AppState>>,
    Path(deployment): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<FieldUpdate>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    // An unreadable body is reported as a server error, matching the rest
    // of this API's failure contract.
    let Json(update) =
        payload.map_err(|_| AppError::Internal("failed to decode message".to_owned()))?;

    state
        .service
        .set_field(&credentials(&headers), &deployment, &update.key, &update.value)
        .await?;

    Ok(Json(MessageResponse { message: "done" }))
}

/// Delete a deployment. Terminal: the id is never reused.
async fn delete_deployment(
    State(state): State<Arc<AppState>>,
    Path(deployment): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .service
        .delete(&credentials(&headers), &deployment)
        .await?;

    Ok(Json(MessageResponse { message: "deleted" }))
}

/// Read one field of a deployment.
async fn get_field(
    State(state): State<Arc<AppState>>,
    Path((deployment, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<FieldResponse>, AppError> {
    let value = state
        .service
        .get_field(&credentials(&headers), &deployment, &key)
        .await?;

    Ok(Json(FieldResponse { key, value }))
}
