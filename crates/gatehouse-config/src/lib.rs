// crates/gatehouse-config/src/lib.rs
// ============================================================================
// Module: Gatehouse Config
// Description: Configuration model for the Gatehouse gateway.
// Purpose: Centralize strict, fail-closed configuration handling.
// Dependencies: gatehouse-core, serde, toml
// ============================================================================

//! ## Overview
//! Gatehouse config loads and validates the gateway's immutable inputs: the
//! session signing key, the service credential, the operator allow-list, and
//! the resource root registry. Construction happens once at startup; every
//! component receives its configuration by injection.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::GatewayConfig;
pub use config::OperatorConfig;
pub use config::ResourcesConfig;
pub use config::ServerConfig;
pub use config::ServiceConfig;
pub use config::SessionConfig;
pub use config::load_signing_key;
