// crates/gatehouse-core/src/session.rs
// ============================================================================
// Module: Session Authenticator
// Description: Signed, time-bounded session token issuance and verification.
// Purpose: Provide stateless admin sessions without a server-side store.
// Dependencies: ed25519-dalek, base64, serde_json, time
// ============================================================================

//! ## Overview
//! Session tokens are self-contained: base64url claims, a dot, and a
//! base64url Ed25519 signature over the exact claims bytes. Validity is
//! determined entirely by the signature and the embedded expiry, so the
//! server holds no session state and tokens cannot be revoked before they
//! expire (by design).
//!
//! Verification fails closed: a missing, malformed, tampered, or expired
//! token is always unauthenticated regardless of its claimed role.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::authz::Role;
use crate::error::GatewayError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted encoded token length in bytes.
const MAX_TOKEN_BYTES: usize = 4 * 1024;

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject identifier (operator username).
    pub sub: String,
    /// Role claim.
    pub role: Role,
    /// Issuance time as unix seconds.
    pub iat: i64,
    /// Expiry time as unix seconds. Tokens live exactly from `iat` to `exp`.
    pub exp: i64,
}

// ============================================================================
// SECTION: Authenticator
// ============================================================================

/// Issues and verifies signed session tokens.
pub struct SessionAuthenticator {
    /// Server-held signing key.
    signing_key: SigningKey,
    /// Verification half of the signing key.
    verifying_key: VerifyingKey,
    /// Fixed expiry horizon applied at issuance, in seconds.
    ttl_secs: i64,
}

impl SessionAuthenticator {
    /// Builds an authenticator from a signing key and expiry horizon.
    #[must_use]
    pub fn new(signing_key: SigningKey, ttl_secs: i64) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
            ttl_secs,
        }
    }

    /// Mints a signed session token for the given subject and role.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] when claims serialization fails.
    pub fn issue(&self, subject: &str, role: Role) -> Result<String, GatewayError> {
        self.issue_at(subject, role, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Mints a token with an explicit issuance instant.
    fn issue_at(&self, subject: &str, role: Role, now_unix: i64) -> Result<String, GatewayError> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            role,
            iat: now_unix,
            exp: now_unix.saturating_add(self.ttl_secs),
        };
        let payload = serde_json::to_vec(&claims).map_err(|err| GatewayError::Internal {
            detail: format!("claims serialization failed: {err}"),
        })?;
        let signature = self.signing_key.sign(&payload);
        Ok(format!(
            "{}.{}",
            Base64Url.encode(&payload),
            Base64Url.encode(signature.to_bytes())
        ))
    }

    /// Verifies a presented token and returns its decoded claims.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] when the token is malformed,
    /// the signature does not verify, or the token has expired.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, GatewayError> {
        self.verify_at(token, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Verifies a token against an explicit current instant.
    fn verify_at(&self, token: &str, now_unix: i64) -> Result<SessionClaims, GatewayError> {
        if token.is_empty() || token.len() > MAX_TOKEN_BYTES {
            return Err(invalid_token());
        }
        let (payload_b64, signature_b64) = token.split_once('.').ok_or_else(invalid_token)?;
        let payload = Base64Url.decode(payload_b64).map_err(|_| invalid_token())?;
        let signature_bytes = Base64Url.decode(signature_b64).map_err(|_| invalid_token())?;
        let signature =
            Signature::try_from(signature_bytes.as_slice()).map_err(|_| invalid_token())?;
        self.verifying_key.verify_strict(&payload, &signature).map_err(|_| invalid_token())?;
        let claims: SessionClaims =
            serde_json::from_slice(&payload).map_err(|_| invalid_token())?;
        if now_unix >= claims.exp {
            return Err(GatewayError::Unauthenticated("session expired".to_string()));
        }
        Ok(claims)
    }
}

/// Builds the uniform invalid-token failure.
fn invalid_token() -> GatewayError {
    GatewayError::Unauthenticated("invalid session token".to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
