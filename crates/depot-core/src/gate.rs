//! The authorization gate.
//!
//! Every guarded operation asks the gate exactly once, before touching the
//! store. The decision combines three mechanisms, first match wins:
//! admin override, recorded-owner match, and token scope.

use tracing::debug;

use crate::deployment::DeploymentStore;
use crate::identity::Identity;
use crate::token::CapabilityToken;

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    /// Whether the operation may proceed.
    #[must_use]
    pub fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decides whether a caller may act on a deployment.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    store: DeploymentStore,
}

impl AuthorizationGate {
    /// Create a gate consulting `store` for owner records.
    #[must_use]
    pub fn new(store: DeploymentStore) -> Self {
        Self { store }
    }

    /// Decide whether the caller may act on `deployment_id`.
    ///
    /// Decision order, first match wins:
    ///
    /// 1. a resolved admin identity;
    /// 2. a resolved identity whose uid equals the recorded owner;
    /// 3. a verified token that is admin-wide, scoped to this deployment,
    ///    or whose embedded subject uid equals the recorded owner.
    ///
    /// An owner lookup that fails or finds no record counts as "no match",
    /// never as an error: absence is the normal state for deleted or
    /// never-created ids, and the check degrades to token-only
    /// authorization. Lookup errors are treated identically to absence.
    pub async fn authorize(
        &self,
        identity: Option<&Identity>,
        token: Option<&CapabilityToken>,
        deployment_id: &str,
    ) -> Decision {
        if identity.is_some_and(|i| i.admin) {
            return Decision::Allow;
        }

        let owner = match self.store.owner(deployment_id).await {
            Ok(owner) => owner,
            Err(err) => {
                debug!(deployment = %deployment_id, error = %err, "owner lookup failed");
                None
            }
        };

        if let (Some(identity), Some(owner)) = (identity, owner.as_deref()) {
            if identity.uid == owner {
                return Decision::Allow;
            }
        }

        if let Some(token) = token {
            if token.admin {
                return Decision::Allow;
            }
            if token.deployment_id.as_deref() == Some(deployment_id) {
                return Decision::Allow;
            }
            if let (Some(subject), Some(owner)) = (token.subject_uid.as_deref(), owner.as_deref())
            {
                if subject == owner {
                    return Decision::Allow;
                }
            }
            debug!(
                deployment = %deployment_id,
                claimed = token.deployment_id.as_deref().unwrap_or("-"),
                "token does not cover deployment"
            );
        }

        Decision::Deny
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use depot_storage::MemoryBackend;

    fn identity(uid: &str, admin: bool) -> Identity {
        Identity {
            uid: uid.to_owned(),
            admin,
            namespaces: std::collections::HashMap::new(),
            logged: true,
        }
    }

    fn scoped_token(deployment_id: &str) -> CapabilityToken {
        CapabilityToken {
            deployment_id: Some(deployment_id.to_owned()),
            subject_uid: Some("alice".to_owned()),
            admin: false,
            issued_at: None,
            expires_at: None,
        }
    }

    async fn gate_with_deployment(owner: &str) -> (AuthorizationGate, String) {
        let store = DeploymentStore::new(Arc::new(MemoryBackend::new()), "depot");
        let id = store.create(owner, None).await.unwrap();
        (AuthorizationGate::new(store), id)
    }

    // The three inputs (admin identity, owner identity, scoped token) in
    // every combination. Any single mechanism present must be sufficient.

    #[tokio::test]
    async fn no_credentials_denies() {
        let (gate, id) = gate_with_deployment("alice").await;
        assert_eq!(gate.authorize(None, None, &id).await, Decision::Deny);
    }

    #[tokio::test]
    async fn scoped_token_alone_allows() {
        let (gate, id) = gate_with_deployment("alice").await;
        let token = scoped_token(&id);
        assert_eq!(
            gate.authorize(None, Some(&token), &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn owner_identity_alone_allows() {
        let (gate, id) = gate_with_deployment("alice").await;
        let alice = identity("alice", false);
        assert_eq!(
            gate.authorize(Some(&alice), None, &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn owner_identity_with_token_allows() {
        let (gate, id) = gate_with_deployment("alice").await;
        let alice = identity("alice", false);
        let token = scoped_token(&id);
        assert_eq!(
            gate.authorize(Some(&alice), Some(&token), &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn admin_identity_alone_allows() {
        let (gate, id) = gate_with_deployment("alice").await;
        let root = identity("root", true);
        assert_eq!(
            gate.authorize(Some(&root), None, &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn admin_identity_with_token_allows() {
        let (gate, id) = gate_with_deployment("alice").await;
        let root = identity("root", true);
        let token = scoped_token(&id);
        assert_eq!(
            gate.authorize(Some(&root), Some(&token), &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn admin_and_owner_identity_allows() {
        let (gate, id) = gate_with_deployment("alice").await;
        let alice_admin = identity("alice", true);
        assert_eq!(
            gate.authorize(Some(&alice_admin), None, &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn all_three_mechanisms_allow() {
        let (gate, id) = gate_with_deployment("alice").await;
        let alice_admin = identity("alice", true);
        let token = scoped_token(&id);
        assert_eq!(
            gate.authorize(Some(&alice_admin), Some(&token), &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn stranger_identity_denies() {
        let (gate, id) = gate_with_deployment("alice").await;
        let mallory = identity("mallory", false);
        assert_eq!(
            gate.authorize(Some(&mallory), None, &id).await,
            Decision::Deny
        );
    }

    #[tokio::test]
    async fn token_for_other_deployment_denies() {
        let (gate, id) = gate_with_deployment("alice").await;
        let token = scoped_token("some-other-deployment");
        let mallory = identity("mallory", false);
        assert_eq!(
            gate.authorize(Some(&mallory), Some(&token), &id).await,
            Decision::Deny
        );
    }

    #[tokio::test]
    async fn admin_token_allows_any_deployment() {
        let (gate, id) = gate_with_deployment("alice").await;
        let token = CapabilityToken {
            deployment_id: Some("some-other-deployment".to_owned()),
            subject_uid: Some("root".to_owned()),
            admin: true,
            issued_at: None,
            expires_at: None,
        };
        assert_eq!(
            gate.authorize(None, Some(&token), &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn unscoped_token_matching_owner_allows() {
        // The opaque codec yields tokens with no deployment id; the embedded
        // subject uid is matched against the recorded owner instead.
        let (gate, id) = gate_with_deployment("alice").await;
        let token = CapabilityToken {
            deployment_id: None,
            subject_uid: Some("alice".to_owned()),
            admin: false,
            issued_at: None,
            expires_at: None,
        };
        assert_eq!(
            gate.authorize(None, Some(&token), &id).await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn unscoped_token_for_stranger_denies() {
        let (gate, id) = gate_with_deployment("alice").await;
        let token = CapabilityToken {
            deployment_id: None,
            subject_uid: Some("mallory".to_owned()),
            admin: false,
            issued_at: None,
            expires_at: None,
        };
        assert_eq!(
            gate.authorize(None, Some(&token), &id).await,
            Decision::Deny
        );
    }

    #[tokio::test]
    async fn missing_owner_record_degrades_to_token_check() {
        let store = DeploymentStore::new(Arc::new(MemoryBackend::new()), "depot");
        let gate = AuthorizationGate::new(store);

        // No record exists: an owner identity cannot match...
        let alice = identity("alice", false);
        assert_eq!(
            gate.authorize(Some(&alice), None, "ghost").await,
            Decision::Deny
        );

        // ...but a token scoped to the id still passes.
        let token = scoped_token("ghost");
        assert_eq!(
            gate.authorize(None, Some(&token), "ghost").await,
            Decision::Allow
        );
    }
}
