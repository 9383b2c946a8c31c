// crates/gatehouse-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Integration tests for configuration loading and validation.
// Purpose: Validate fail-closed behavior for malformed configuration.
// Dependencies: gatehouse-config, tempfile
// ============================================================================

//! Configuration validation integration tests.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

use std::fs;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use ed25519_dalek::SigningKey;
use gatehouse_config::GatewayConfig;
use gatehouse_config::load_signing_key;
use rand::rngs::OsRng;
use tempfile::TempDir;

/// Returns a complete, valid configuration document.
fn valid_config_toml() -> String {
    r#"
[server]
bind = "127.0.0.1:8080"

[session]
signing_key_path = "/etc/gatehouse/session.key"
ttl_secs = 3600

[[session.operators]]
username = "admin"
password = "operator-pass-1"
role = "admin"

[service]
credential = "service-token-123"
internal_origin = "http://api.internal:3001"

[resources]
[resources.roots]
reports = "/srv/gatehouse/reports"
config = "/srv/gatehouse/config"
"#
    .to_string()
}

fn load_from_str(content: &str) -> Result<GatewayConfig, gatehouse_config::ConfigError> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gatehouse.toml");
    fs::write(&path, content).unwrap();
    GatewayConfig::load(Some(&path))
}

#[test]
fn valid_config_loads_with_defaults() {
    let config = load_from_str(&valid_config_toml()).unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:8080");
    assert_eq!(config.session.ttl_secs, 3_600);
    assert_eq!(config.service.max_redirects, 0);
    assert_eq!(config.service.request_timeout_ms, 5_000);
    assert_eq!(config.resources.roots.len(), 2);
}

#[test]
fn short_credential_is_rejected() {
    let content = valid_config_toml().replace("service-token-123", "short");
    let err = load_from_str(&content).unwrap_err();
    assert!(err.to_string().contains("credential"));
}

#[test]
fn origin_with_path_is_rejected() {
    let content =
        valid_config_toml().replace("http://api.internal:3001", "http://api.internal:3001/api");
    let err = load_from_str(&content).unwrap_err();
    assert!(err.to_string().contains("internal_origin"));
}

#[test]
fn non_http_origin_is_rejected() {
    let content =
        valid_config_toml().replace("http://api.internal:3001", "ftp://api.internal:3001");
    assert!(load_from_str(&content).is_err());
}

#[test]
fn missing_operators_are_rejected() {
    let content = valid_config_toml().replace(
        r#"[[session.operators]]
username = "admin"
password = "operator-pass-1"
role = "admin"
"#,
        "",
    );
    let err = load_from_str(&content).unwrap_err();
    assert!(err.to_string().contains("operators"));
}

#[test]
fn short_operator_password_is_rejected() {
    let content = valid_config_toml().replace("operator-pass-1", "short");
    assert!(load_from_str(&content).is_err());
}

#[test]
fn unknown_role_is_rejected_at_parse_time() {
    let content = valid_config_toml().replace("role = \"admin\"", "role = \"superuser\"");
    assert!(load_from_str(&content).is_err());
}

#[test]
fn empty_roots_are_rejected() {
    let content = valid_config_toml().replace(
        r#"reports = "/srv/gatehouse/reports"
config = "/srv/gatehouse/config"
"#,
        "",
    );
    let err = load_from_str(&content).unwrap_err();
    assert!(err.to_string().contains("roots"));
}

#[test]
fn root_name_with_separator_is_rejected() {
    let content = valid_config_toml()
        .replace("reports = \"/srv/gatehouse/reports\"", "\"bad/name\" = \"/srv/gatehouse\"");
    assert!(load_from_str(&content).is_err());
}

#[test]
fn ttl_out_of_range_is_rejected() {
    let content = valid_config_toml().replace("ttl_secs = 3600", "ttl_secs = 5");
    assert!(load_from_str(&content).is_err());
}

#[test]
fn excessive_redirect_limit_is_rejected() {
    let content = valid_config_toml().replace(
        "internal_origin = \"http://api.internal:3001\"",
        "internal_origin = \"http://api.internal:3001\"\nmax_redirects = 12",
    );
    assert!(load_from_str(&content).is_err());
}

#[test]
fn signing_key_loads_raw_and_base64() {
    let dir = TempDir::new().unwrap();
    let key = SigningKey::generate(&mut OsRng);

    let raw_path = dir.path().join("raw.key");
    fs::write(&raw_path, key.to_bytes()).unwrap();
    let loaded = load_signing_key(&raw_path).unwrap();
    assert_eq!(loaded.to_bytes(), key.to_bytes());

    let b64_path = dir.path().join("b64.key");
    fs::write(&b64_path, Base64.encode(key.to_bytes())).unwrap();
    let loaded = load_signing_key(&b64_path).unwrap();
    assert_eq!(loaded.to_bytes(), key.to_bytes());
}

#[test]
fn truncated_signing_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.key");
    fs::write(&path, [0u8; 16]).unwrap();
    assert!(load_signing_key(&path).is_err());
}
