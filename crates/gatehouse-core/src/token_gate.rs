// crates/gatehouse-core/src/token_gate.rs
// ============================================================================
// Module: Token Gate
// Description: Shared-secret bearer credential validation.
// Purpose: Gate service-to-service calls behind a constant-time match.
// Dependencies: subtle (via security helpers)
// ============================================================================

//! ## Overview
//! The token gate validates the `Authorization` header presented on
//! service-to-service calls. The header must use the `Bearer <value>` form;
//! anything else fails closed as unauthenticated. Presented values are
//! compared against the configured credential in constant time so a
//! mismatched value is rejected without a timing side-channel.
//!
//! The gate is stateless and reentrant; a successful check has no side
//! effect beyond allowing the request to proceed.

use crate::error::GatewayError;
use crate::security::constant_time_eq_str;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header length in bytes.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

/// Remediation hint returned with unauthenticated failures.
const BEARER_HINT: &str = "use Authorization: Bearer <token> header";

// ============================================================================
// SECTION: Token Gate
// ============================================================================

/// Validates shared-secret bearer credentials on service-facing calls.
pub struct TokenGate {
    /// Configured service credential. Exactly one value is active at a time.
    credential: String,
}

impl TokenGate {
    /// Builds a token gate around the configured credential.
    #[must_use]
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
        }
    }

    /// Authorizes an inbound request by its `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] when the header is absent or
    /// malformed, and [`GatewayError::Forbidden`] when the presented value
    /// does not match the configured credential.
    pub fn authorize(&self, auth_header: Option<&str>) -> Result<(), GatewayError> {
        let presented = parse_bearer_value(auth_header)?;
        if !constant_time_eq_str(&presented, &self.credential) {
            return Err(GatewayError::Forbidden("invalid service credential".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the bearer value from an `Authorization` header.
fn parse_bearer_value(auth_header: Option<&str>) -> Result<String, GatewayError> {
    let header = auth_header.ok_or_else(|| {
        GatewayError::Unauthenticated(format!("service credential required; {BEARER_HINT}"))
    })?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(GatewayError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || value.is_empty() {
        return Err(GatewayError::Unauthenticated(format!(
            "invalid authorization header; {BEARER_HINT}"
        )));
    }
    Ok(value.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions."
    )]

    use super::TokenGate;
    use crate::error::GatewayError;

    fn gate() -> TokenGate {
        TokenGate::new("service-token-123")
    }

    #[test]
    fn missing_header_is_unauthenticated_with_hint() {
        let err = gate().authorize(None).unwrap_err();
        let GatewayError::Unauthenticated(message) = err else {
            panic!("expected unauthenticated, got {err:?}");
        };
        assert!(message.contains("Authorization: Bearer"));
    }

    #[test]
    fn non_bearer_scheme_is_unauthenticated() {
        let err = gate().authorize(Some("Basic dXNlcjpwYXNz")).unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated(_)));
    }

    #[test]
    fn empty_bearer_value_is_unauthenticated() {
        let err = gate().authorize(Some("Bearer ")).unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated(_)));
    }

    #[test]
    fn oversized_header_is_unauthenticated() {
        let header = format!("Bearer {}", "a".repeat(9 * 1024));
        let err = gate().authorize(Some(&header)).unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated(_)));
    }

    #[test]
    fn mismatched_credential_is_forbidden() {
        let err = gate().authorize(Some("Bearer service-token-124")).unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden(_)));
    }

    #[test]
    fn exact_match_passes() {
        assert!(gate().authorize(Some("Bearer service-token-123")).is_ok());
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert!(gate().authorize(Some("bearer service-token-123")).is_ok());
    }
}
