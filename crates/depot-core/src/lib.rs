//! Core library for Depot.
//!
//! Contains identity resolution against the external directory, capability
//! token codecs (signed claims and opaque encrypted), the authorization
//! gate, the deployment store, and the service that orchestrates them. This
//! crate depends on `depot-storage` for the storage backend trait and knows
//! nothing about HTTP routing or the CLI.

pub mod crypto;
pub mod deployment;
pub mod error;
pub mod gate;
pub mod identity;
pub mod service;
pub mod token;
