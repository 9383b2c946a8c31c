// crates/gatehouse-core/src/error.rs
// ============================================================================
// Module: Gateway Error Taxonomy
// Description: Shared error taxonomy for all trust boundary decisions.
// Purpose: Provide a fail-closed error model that never leaks internal detail.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every boundary component reports failures through [`GatewayError`]. The
//! taxonomy distinguishes missing identity, insufficient authority, unsafe
//! input, absent resources, and upstream faults. Upstream and internal
//! variants carry detail for server-side audit logging only; their `Display`
//! output is deliberately generic so raw error text never reaches a caller.

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway error taxonomy shared across boundary components.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or invalid credential or session.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Valid identity with insufficient role or wrong credential value.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Malformed or unsafe input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource is absent.
    #[error("not found: {0}")]
    NotFound(String),
    /// Internal call failed or timed out. Display output is generic; the
    /// detail field is for audit sinks only.
    #[error("upstream request failed")]
    Upstream {
        /// Internal failure detail, logged server-side only.
        detail: String,
    },
    /// Unexpected fault. Display output is generic; the detail field is for
    /// audit sinks only.
    #[error("internal error")]
    Internal {
        /// Internal failure detail, logged server-side only.
        detail: String,
    },
}

impl GatewayError {
    /// Returns the internal detail for audit logging, when present.
    #[must_use]
    pub fn audit_detail(&self) -> Option<&str> {
        match self {
            Self::Upstream {
                detail,
            }
            | Self::Internal {
                detail,
            } => Some(detail.as_str()),
            _ => None,
        }
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

    use super::GatewayError;

    #[test]
    fn upstream_display_is_generic() {
        let err = GatewayError::Upstream {
            detail: "connect to 10.0.0.7:3001 refused".to_string(),
        };
        assert_eq!(err.to_string(), "upstream request failed");
        assert_eq!(err.audit_detail(), Some("connect to 10.0.0.7:3001 refused"));
    }

    #[test]
    fn internal_display_is_generic() {
        let err = GatewayError::Internal {
            detail: "client build failed".to_string(),
        };
        assert_eq!(err.to_string(), "internal error");
    }

    #[test]
    fn caller_facing_variants_expose_no_audit_detail() {
        let err = GatewayError::BadRequest("invalid path".to_string());
        assert!(err.audit_detail().is_none());
    }
}
