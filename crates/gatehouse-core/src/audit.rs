// crates/gatehouse-core/src/audit.rs
// ============================================================================
// Module: Access Audit
// Description: Structured audit events for boundary decisions.
// Purpose: Record allow/deny outcomes without leaking secrets to callers.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every boundary decision (token gate, session check, sandbox resolution,
//! proxy dispatch) emits an [`AccessAuditEvent`] through an
//! [`AccessAuditSink`]. Events carry decision metadata only; credential
//! values and canonicalized filesystem paths are never recorded.

use serde::Serialize;

use crate::error::GatewayError;

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Trust boundary label for audit events.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Service-to-service bearer credential gate.
    TokenGate,
    /// Session-authenticated admin boundary.
    Session,
    /// Sandboxed file resolution.
    Resource,
    /// Credentialed outbound proxy.
    Proxy,
}

/// Access audit event payload.
#[derive(Debug, Serialize)]
pub struct AccessAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Boundary that produced the decision.
    boundary: Boundary,
    /// Caller subject when authenticated.
    subject: Option<String>,
    /// Caller IP address when available.
    peer_ip: Option<String>,
    /// Logical target of the request (route or logical path).
    target: String,
    /// Failure reason (for deny events).
    reason: Option<String>,
}

impl AccessAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(boundary: Boundary, target: impl Into<String>) -> Self {
        Self {
            event: "gateway_access",
            decision: "allow",
            boundary,
            subject: None,
            peer_ip: None,
            target: target.into(),
            reason: None,
        }
    }

    /// Builds a deny event from a gateway error.
    #[must_use]
    pub fn denied(boundary: Boundary, target: impl Into<String>, error: &GatewayError) -> Self {
        let reason = error.audit_detail().map_or_else(|| error.to_string(), str::to_string);
        Self {
            event: "gateway_access",
            decision: "deny",
            boundary,
            subject: None,
            peer_ip: None,
            target: target.into(),
            reason: Some(reason),
        }
    }

    /// Returns a copy with the caller subject set.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Returns a copy with the peer IP set.
    #[must_use]
    pub fn with_peer_ip(mut self, peer_ip: impl Into<String>) -> Self {
        self.peer_ip = Some(peer_ip.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for boundary decisions.
pub trait AccessAuditSink: Send + Sync {
    /// Record an access audit event.
    fn record(&self, event: &AccessAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AccessAuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is the audit transport for this sink.")]
    fn record(&self, event: &AccessAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl AccessAuditSink for NoopAuditSink {
    fn record(&self, _event: &AccessAuditEvent) {}
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

    use serde_json::Value;

    use super::AccessAuditEvent;
    use super::Boundary;
    use crate::error::GatewayError;

    #[test]
    fn deny_event_keeps_internal_detail_in_reason() {
        let err = GatewayError::Upstream {
            detail: "connect refused".to_string(),
        };
        let event = AccessAuditEvent::denied(Boundary::Proxy, "/internal-call", &err);
        let json: Value = serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["decision"], "deny");
        assert_eq!(json["boundary"], "proxy");
        // The audit record keeps the internal detail; callers never see it.
        assert_eq!(json["reason"], "connect refused");
    }

    #[test]
    fn allow_event_carries_subject_and_peer() {
        let event = AccessAuditEvent::allowed(Boundary::Session, "/admin/dashboard")
            .with_subject("operator")
            .with_peer_ip("127.0.0.1");
        let json: Value = serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["decision"], "allow");
        assert_eq!(json["subject"], "operator");
        assert_eq!(json["peer_ip"], "127.0.0.1");
    }
}
