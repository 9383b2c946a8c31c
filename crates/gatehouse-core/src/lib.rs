// crates/gatehouse-core/src/lib.rs
// ============================================================================
// Module: Gatehouse Core
// Description: Trust boundary primitives for the Gatehouse gateway.
// Purpose: Decide whether requests may read files, reach admin pages, or
//          have privileged outbound calls made on their behalf.
// Dependencies: ed25519-dalek, reqwest, subtle, serde
// ============================================================================

//! ## Overview
//! Gatehouse core provides the access-control primitives behind the
//! gateway's three trust boundaries: the anonymous public boundary, the
//! session-authenticated admin boundary, and the service-to-service bearer
//! credential boundary. Every component fails closed; ambiguity is a denial,
//! never an implicit allow.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod authz;
pub mod error;
pub mod proxy;
pub mod sandbox;
pub mod security;
pub mod session;
pub mod token_gate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AccessAuditEvent;
pub use audit::AccessAuditSink;
pub use audit::Boundary;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use authz::Role;
pub use authz::require_role;
pub use error::GatewayError;
pub use proxy::CallDescriptor;
pub use proxy::InternalApiClient;
pub use proxy::ProxyConfig;
pub use proxy::UpstreamResponse;
pub use sandbox::ResolvedResource;
pub use sandbox::RootRegistry;
pub use sandbox::RootRegistryError;
pub use sandbox::read_resource_limited;
pub use security::constant_time_eq;
pub use security::constant_time_eq_str;
pub use session::SessionAuthenticator;
pub use session::SessionClaims;
pub use token_gate::TokenGate;
