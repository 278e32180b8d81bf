//! Identity resolution against the external identity directory.
//!
//! An [`Identity`] is produced fresh for every request: either from a
//! directory lookup keyed by the caller's API key, or as the fixed anonymous
//! pseudo-identity when the process runs with anonymous access enabled.
//! Nothing here is cached or persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Uid assigned to callers without a credential when anonymous access is on.
const ANONYMOUS_UID: &str = "anonymous";

/// A verified caller identity.
///
/// The opaque token codec encrypts the JSON serialization of this struct,
/// so field names are part of the token wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Unique user id as known to the identity directory.
    pub uid: String,
    /// Admins pass every authorization check.
    #[serde(default)]
    pub admin: bool,
    /// Namespace membership: `true` = owner of the namespace, `false` = member.
    #[serde(default)]
    pub namespaces: HashMap<String, bool>,
    /// Whether the identity was established for this request.
    #[serde(default)]
    pub logged: bool,
}

impl Identity {
    /// The fixed pseudo-identity used for anonymous access.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            uid: ANONYMOUS_UID.to_owned(),
            admin: false,
            namespaces: HashMap::new(),
            logged: true,
        }
    }

    /// Whether this identity owns the given namespace.
    #[must_use]
    pub fn owns_namespace(&self, namespace: &str) -> bool {
        self.namespaces.get(namespace).copied().unwrap_or(false)
    }
}

/// Request body for the directory's `POST /auth/api` endpoint.
#[derive(Serialize)]
struct ApiKeyLookup<'a> {
    key: &'a str,
}

/// Resolves raw API keys into verified identities.
///
/// Every call performs a fresh directory lookup; results are never cached,
/// so key revocation at the directory takes effect on the next request.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    http: reqwest::Client,
    directory_url: String,
    allow_anonymous: bool,
}

impl IdentityResolver {
    /// Create a resolver for the directory at `directory_url`.
    #[must_use]
    pub fn new(directory_url: impl Into<String>, allow_anonymous: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            directory_url: directory_url.into(),
            allow_anonymous,
        }
    }

    /// Resolve an API key into an [`Identity`].
    ///
    /// With anonymous access enabled, an empty key yields the fixed
    /// anonymous identity and a non-empty key is trusted as the caller's
    /// uid without a directory round-trip. Otherwise the key is verified
    /// against the directory.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredential`] if the key is empty and anonymous
    ///   access is disabled.
    /// - [`AuthError::InvalidCredential`] if the directory rejects the key.
    ///   A directory outage or a malformed response is indistinguishable
    ///   from a bad key at this boundary.
    pub async fn resolve(&self, api_key: &str) -> Result<Identity, AuthError> {
        if api_key.is_empty() {
            if self.allow_anonymous {
                return Ok(Identity::anonymous());
            }
            return Err(AuthError::MissingCredential);
        }

        if self.allow_anonymous {
            // Anonymous mode trusts the presented key as the caller's uid.
            return Ok(Identity {
                uid: api_key.to_owned(),
                admin: false,
                namespaces: HashMap::new(),
                logged: true,
            });
        }

        let url = format!("{}/auth/api", self.directory_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&ApiKeyLookup { key: api_key })
            .send()
            .await
            .map_err(|e| AuthError::InvalidCredential {
                reason: format!("failed to contact identity directory: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(AuthError::InvalidCredential {
                reason: format!("identity directory returned {}", response.status()),
            });
        }

        let mut identity: Identity =
            response
                .json()
                .await
                .map_err(|e| AuthError::InvalidCredential {
                    reason: format!("malformed identity directory response: {e}"),
                })?;
        identity.logged = true;

        debug!(uid = %identity.uid, "credential resolved");
        Ok(identity)
    }
}
