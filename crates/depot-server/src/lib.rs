//! Depot HTTP server.
//!
//! Wires the core library and a storage backend into a running Axum server
//! exposing the `/store` REST surface.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
