// crates/gatehouse-core/src/authz.rs
// ============================================================================
// Module: Role Authorizer
// Description: Role claim enforcement for session-authenticated operations.
// Purpose: Require a decoded session to carry the role an operation demands.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The role authorizer runs after session verification: the caller already
//! holds a valid identity, so a role mismatch is a forbidden outcome rather
//! than an unauthenticated one. The role set is a closed enum; adding a role
//! means adding a variant, and every comparison stays exhaustive.

use serde::Deserialize;
use serde::Serialize;

use crate::error::GatewayError;
use crate::session::SessionClaims;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Role claim carried by session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Operator role with access to admin pages and the credentialed proxy.
    Admin,
    /// Authenticated caller without admin authority.
    Guest,
}

impl Role {
    /// Returns the wire label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Guest => "guest",
        }
    }
}

// ============================================================================
// SECTION: Enforcement
// ============================================================================

/// Requires the decoded session to carry the given role.
///
/// # Errors
///
/// Returns [`GatewayError::Forbidden`] when the session's role does not match
/// the required role.
pub fn require_role(claims: &SessionClaims, required: Role) -> Result<(), GatewayError> {
    if claims.role == required {
        Ok(())
    } else {
        Err(GatewayError::Forbidden(format!("{} access required", required.as_str())))
    }
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

    use super::Role;
    use super::require_role;
    use crate::error::GatewayError;
    use crate::session::SessionClaims;

    fn claims(role: Role) -> SessionClaims {
        SessionClaims {
            sub: "operator".to_string(),
            role,
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        }
    }

    #[test]
    fn matching_role_is_allowed() {
        assert!(require_role(&claims(Role::Admin), Role::Admin).is_ok());
    }

    #[test]
    fn guest_requesting_admin_operation_is_forbidden() {
        let err = require_role(&claims(Role::Guest), Role::Admin).unwrap_err();
        let GatewayError::Forbidden(message) = err else {
            panic!("expected forbidden, got {err:?}");
        };
        assert_eq!(message, "admin access required");
    }

    #[test]
    fn role_labels_are_stable() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Guest.as_str(), "guest");
    }
}
