//! The deployment service.
//!
//! Orchestrates identity resolution, token handling, the authorization
//! gate, and the deployment store behind one interface per HTTP verb. This
//! is the only component whose side effects are visible to callers; the
//! HTTP layer above it is routing glue.
//!
//! All collaborators are injected at construction. The service holds no
//! mutable state of its own and is shared across requests behind an `Arc`.

use std::sync::Arc;

use tracing::debug;

use crate::deployment::DeploymentStore;
use crate::error::ServiceError;
use crate::gate::{AuthorizationGate, Decision};
use crate::identity::IdentityResolver;
use crate::token::{TokenCodec, strip_bearer};

/// Raw credentials extracted from a request.
///
/// Either or both may be present; the gate decides what they add up to.
#[derive(Debug, Default, Clone)]
pub struct Credentials {
    /// Value of the `X-API-Key` header.
    pub api_key: Option<String>,
    /// Value of the `Authorization` header, `Bearer` marker included.
    pub bearer: Option<String>,
}

/// Result of creating a deployment.
#[derive(Debug)]
pub struct CreatedDeployment {
    /// The fresh deployment id.
    pub id: String,
    /// Capability token scoped to the deployment.
    pub token: String,
}

/// Orchestrates the access-control subsystem over the deployment store.
pub struct DeploymentService {
    resolver: IdentityResolver,
    codec: Arc<dyn TokenCodec>,
    gate: AuthorizationGate,
    store: DeploymentStore,
}

impl std::fmt::Debug for DeploymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentService").finish_non_exhaustive()
    }
}

impl DeploymentService {
    /// Assemble the service from its collaborators.
    #[must_use]
    pub fn new(
        resolver: IdentityResolver,
        codec: Arc<dyn TokenCodec>,
        store: DeploymentStore,
    ) -> Self {
        let gate = AuthorizationGate::new(store.clone());
        Self {
            resolver,
            codec,
            gate,
            store,
        }
    }

    /// Create a deployment for the caller identified by `api_key` and issue
    /// its capability token.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Auth`] if the credential does not resolve or token
    ///   issuance fails.
    /// - [`ServiceError::Store`] if the store rejects the create.
    pub async fn create(
        &self,
        api_key: &str,
        namespace: Option<&str>,
    ) -> Result<CreatedDeployment, ServiceError> {
        let identity = self.resolver.resolve(api_key).await?;
        let id = self.store.create(&identity.uid, namespace).await?;
        let token = self.codec.issue(&identity, &id)?;
        Ok(CreatedDeployment { id, token })
    }

    /// Read one field of a deployment.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotAuthorized`] if the gate denies.
    /// - [`ServiceError::Store`] if the field or deployment is absent or
    ///   the read fails.
    pub async fn get_field(
        &self,
        creds: &Credentials,
        id: &str,
        key: &str,
    ) -> Result<String, ServiceError> {
        self.authorize(creds, id).await?;
        Ok(self.store.get_field(id, key).await?)
    }

    /// List data fields of a deployment, optionally filtered by key prefix.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotAuthorized`] if the gate denies.
    /// - [`ServiceError::Store`] if the deployment is absent or the read fails.
    pub async fn list_fields(
        &self,
        creds: &Credentials,
        id: &str,
        filter: Option<&str>,
    ) -> Result<std::collections::HashMap<String, String>, ServiceError> {
        self.authorize(creds, id).await?;
        Ok(self.store.list_fields(id, filter).await?)
    }

    /// Write one field of a deployment and bump its update timestamp.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotAuthorized`] if the gate denies.
    /// - [`ServiceError::Store`] if the deployment is absent or a write fails.
    pub async fn set_field(
        &self,
        creds: &Credentials,
        id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ServiceError> {
        self.authorize(creds, id).await?;
        Ok(self.store.set_field(id, key, value).await?)
    }

    /// Delete a deployment. Terminal: the id is never reused.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotAuthorized`] if the gate denies.
    /// - [`ServiceError::Store`] if the delete fails.
    pub async fn delete(&self, creds: &Credentials, id: &str) -> Result<(), ServiceError> {
        self.authorize(creds, id).await?;
        Ok(self.store.delete(id).await?)
    }

    /// Run the gate once for a guarded operation.
    ///
    /// A bad API key or a bad token silently falls through to the other
    /// mechanism; only the combined decision is surfaced to the caller.
    async fn authorize(&self, creds: &Credentials, deployment_id: &str) -> Result<(), ServiceError> {
        let identity = match creds.api_key.as_deref() {
            Some(key) if !key.is_empty() => match self.resolver.resolve(key).await {
                Ok(identity) => Some(identity),
                Err(err) => {
                    debug!(error = %err, "api key did not resolve");
                    None
                }
            },
            _ => None,
        };

        let token = match creds.bearer.as_deref() {
            Some(raw) if !raw.trim().is_empty() => match self.codec.verify(strip_bearer(raw)) {
                Ok(token) => Some(token),
                Err(err) => {
                    debug!(error = %err, "bearer token rejected");
                    None
                }
            },
            _ => None,
        };

        match self
            .gate
            .authorize(identity.as_ref(), token.as_ref(), deployment_id)
            .await
        {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(ServiceError::NotAuthorized),
        }
    }
}
