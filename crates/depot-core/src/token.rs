//! Capability token codecs.
//!
//! A deployment capability token is a bearer credential handed out at
//! deployment creation. Whoever holds the bytes can exercise it: there is
//! no revocation list, and expiry is the only bound on validity.
//!
//! Two codecs exist, selected by configuration and never mixed:
//!
//! - [`SignedClaimsCodec`] — a stateless HS256 JWT carrying the deployment
//!   id, subject uid, admin flag, and a 24-hour expiry. Verification is
//!   self-contained.
//! - [`OpaqueCodec`] — reversible AES-256-GCM encryption of the serialized
//!   [`Identity`]. The token says nothing about any deployment; scoping is
//!   the authorization gate's job via the recorded owner.
//!
//! Both fail closed: any verification error propagates as a denial, never
//! as an allow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::crypto::{self, EncryptionKey};
use crate::error::AuthError;
use crate::identity::Identity;

/// Audience claim marking a token as a deployment capability.
const TOKEN_AUDIENCE: &str = "depot/deployment";

/// Signed-claims token lifetime, in hours.
const TOKEN_TTL_HOURS: i64 = 24;

/// The verified view of a presented token.
///
/// Fields are `None` where the codec variant does not carry them; the
/// opaque codec embeds an identity but no deployment id or expiry.
#[derive(Debug, Clone)]
pub struct CapabilityToken {
    /// Deployment the token is scoped to (signed-claims variant only).
    pub deployment_id: Option<String>,
    /// Uid of the identity the token was issued to.
    pub subject_uid: Option<String>,
    /// Admin tokens are valid for any deployment.
    pub admin: bool,
    /// When the token was issued.
    pub issued_at: Option<DateTime<Utc>>,
    /// When the token stops verifying.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Issues and verifies deployment capability tokens.
///
/// Implementations are pure computation (no I/O, no locks), so both
/// methods are synchronous and safe to call from any request handler.
pub trait TokenCodec: Send + Sync {
    /// Issue a token for `identity` scoped to `deployment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenIssue`] if claims serialization or
    /// encryption fails.
    fn issue(&self, identity: &Identity, deployment_id: &str) -> Result<String, AuthError>;

    /// Verify a presented token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] on signature mismatch, wrong key, or
    ///   corrupted bytes.
    /// - [`AuthError::TokenExpired`] when the expiry is in the past.
    /// - [`AuthError::WrongAudience`] when the token was issued for another
    ///   purpose.
    fn verify(&self, token: &str) -> Result<CapabilityToken, AuthError>;
}

/// Strip a leading `Bearer` marker and surrounding whitespace from an
/// `Authorization` header value.
#[must_use]
pub fn strip_bearer(header: &str) -> &str {
    let trimmed = header.trim();
    trimmed
        .strip_prefix("Bearer")
        .map_or(trimmed, str::trim_start)
}

// ── Signed-claims codec ──────────────────────────────────────────────

/// Claims carried by a signed deployment token.
#[derive(Debug, Serialize, Deserialize)]
struct DeploymentClaims {
    /// Deployment id the token grants access to.
    deployment: String,
    /// Uid the token was issued to.
    uid: String,
    #[serde(default)]
    admin: bool,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Stateless HS256 JWT codec.
pub struct SignedClaimsCodec {
    key: Vec<u8>,
}

impl SignedClaimsCodec {
    /// Create a codec signing with the given symmetric secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }
}

impl std::fmt::Debug for SignedClaimsCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedClaimsCodec").finish_non_exhaustive()
    }
}

impl TokenCodec for SignedClaimsCodec {
    fn issue(&self, identity: &Identity, deployment_id: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = DeploymentClaims {
            deployment: deployment_id.to_owned(),
            uid: identity.uid.clone(),
            admin: identity.admin,
            aud: TOKEN_AUDIENCE.to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.key),
        )
        .map_err(|e| AuthError::TokenIssue {
            reason: e.to_string(),
        })
    }

    fn verify(&self, token: &str) -> Result<CapabilityToken, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        // Expiry is exact: a token is rejected strictly after iat + 24h.
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<DeploymentClaims>(
            token,
            &DecodingKey::from_secret(&self.key),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::WrongAudience,
            _ => AuthError::InvalidToken {
                reason: e.to_string(),
            },
        })?;

        Ok(CapabilityToken {
            deployment_id: Some(data.claims.deployment),
            subject_uid: Some(data.claims.uid),
            admin: data.claims.admin,
            issued_at: DateTime::from_timestamp(data.claims.iat, 0),
            expires_at: DateTime::from_timestamp(data.claims.exp, 0),
        })
    }
}

// ── Opaque encrypted codec ───────────────────────────────────────────

/// Reversible-encryption codec: the token is the encrypted identity.
pub struct OpaqueCodec {
    key: EncryptionKey,
}

impl OpaqueCodec {
    /// Create a codec encrypting with a key derived from the given secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: EncryptionKey::from_secret(secret),
        }
    }
}

impl std::fmt::Debug for OpaqueCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpaqueCodec").finish_non_exhaustive()
    }
}

impl TokenCodec for OpaqueCodec {
    fn issue(&self, identity: &Identity, _deployment_id: &str) -> Result<String, AuthError> {
        let plaintext = serde_json::to_vec(identity).map_err(|e| AuthError::TokenIssue {
            reason: format!("identity serialization failed: {e}"),
        })?;

        let ciphertext =
            crypto::encrypt(&self.key, &plaintext).map_err(|e| AuthError::TokenIssue {
                reason: e.to_string(),
            })?;

        Ok(URL_SAFE_NO_PAD.encode(ciphertext))
    }

    fn verify(&self, token: &str) -> Result<CapabilityToken, AuthError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| AuthError::InvalidToken {
                reason: "malformed token encoding".to_owned(),
            })?;

        let plaintext = crypto::decrypt(&self.key, &bytes).map_err(|e| AuthError::InvalidToken {
            reason: e.to_string(),
        })?;

        let identity: Identity =
            serde_json::from_slice(&plaintext).map_err(|e| AuthError::InvalidToken {
                reason: format!("malformed token payload: {e}"),
            })?;

        // No deployment id and no expiry: scope checking is delegated to the
        // authorization gate's owner-record lookup.
        Ok(CapabilityToken {
            deployment_id: None,
            subject_uid: Some(identity.uid),
            admin: identity.admin,
            issued_at: None,
            expires_at: None,
        })
    }
}
