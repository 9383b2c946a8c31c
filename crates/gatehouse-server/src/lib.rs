// crates/gatehouse-server/src/lib.rs
// ============================================================================
// Module: Gatehouse Server
// Description: HTTP surface for the Gatehouse trust boundary gateway.
// Purpose: Wire boundary primitives into inbound routes and the binary.
// Dependencies: gatehouse-core, gatehouse-config, axum, tokio
// ============================================================================

//! ## Overview
//! Gatehouse server exposes the gateway over HTTP: a public sandboxed
//! resource endpoint, a session-gated admin surface with a credentialed
//! proxy, and a token-gated service surface. All boundary decisions live in
//! [`gatehouse_core`]; this crate only routes and translates errors to
//! status codes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use server::GatewayServer;
pub use server::GatewayServerError;
