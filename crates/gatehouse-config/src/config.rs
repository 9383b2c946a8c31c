// crates/gatehouse-config/src/config.rs
// ============================================================================
// Module: Gatehouse Configuration
// Description: Configuration loading and validation for the gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: gatehouse-core, serde, toml, ed25519-dalek
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits
//! and validated section by section before the gateway starts. The signing
//! key, service credential, and root registry are immutable inputs: they are
//! read once here and injected into the boundary components, never consulted
//! as ambient global state afterwards.
//!
//! Security posture: config inputs are untrusted; missing or invalid
//! configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use ed25519_dalek::SigningKey;
use gatehouse_core::Role;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "gatehouse.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "GATEHOUSE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum service credential length.
pub(crate) const MIN_CREDENTIAL_LENGTH: usize = 16;
/// Maximum service credential length.
pub(crate) const MAX_CREDENTIAL_LENGTH: usize = 256;
/// Minimum operator password length.
pub(crate) const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum operator password length.
pub(crate) const MAX_PASSWORD_LENGTH: usize = 256;
/// Maximum operator username length.
pub(crate) const MAX_USERNAME_LENGTH: usize = 128;
/// Maximum number of configured operator accounts.
pub(crate) const MAX_OPERATORS: usize = 32;
/// Minimum session TTL in seconds.
pub(crate) const MIN_SESSION_TTL_SECS: i64 = 60;
/// Maximum session TTL in seconds.
pub(crate) const MAX_SESSION_TTL_SECS: i64 = 86_400;
/// Maximum number of configured resource roots.
pub(crate) const MAX_ROOTS: usize = 64;
/// Minimum outbound connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum outbound connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum outbound request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum outbound request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Maximum allowed manual redirect hops.
pub(crate) const MAX_REDIRECT_LIMIT: u32 = 5;
/// Minimum request/response body limit in bytes.
pub(crate) const MIN_BODY_BYTES: usize = 1024;
/// Maximum request/response body limit in bytes.
pub(crate) const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Maximum served file size limit in bytes.
pub(crate) const MAX_FILE_BYTES: u64 = 256 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Inbound HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session issuance and verification configuration.
    pub session: SessionConfig,
    /// Service credential and internal origin configuration.
    pub service: ServiceConfig,
    /// Sandboxed resource configuration.
    pub resources: ResourcesConfig,
}

/// Inbound HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Session issuance and verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Path to the Ed25519 signing key (32 raw bytes or base64).
    pub signing_key_path: String,
    /// Fixed expiry horizon for issued tokens, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: i64,
    /// Operator allow-list. The default deployment holds one admin account.
    pub operators: Vec<OperatorConfig>,
}

/// A configured operator account.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
    /// Operator username.
    pub username: String,
    /// Operator password, compared in constant time at login.
    pub password: String,
    /// Role embedded in issued session tokens.
    pub role: Role,
}

/// Service credential and internal origin configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Shared-secret bearer credential; exactly one value is active.
    pub credential: String,
    /// Fixed internal origin for the credentialed proxy.
    pub internal_origin: String,
    /// Outbound connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Outbound request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum manual redirect hops; zero returns redirects verbatim.
    #[serde(default)]
    pub max_redirects: u32,
    /// Maximum upstream response size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_response_bytes: usize,
}

/// Sandboxed resource configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    /// Maximum served file size in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Logical root name to base directory mapping.
    pub roots: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Loading & Validation
// ============================================================================

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.session.validate()?;
        self.service.validate()?;
        self.resources.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    /// Validates the server section.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid("server.bind must be a socket address".to_string()))?;
        if !(MIN_BODY_BYTES..=MAX_BODY_BYTES).contains(&self.max_body_bytes) {
            return Err(ConfigError::Invalid("server.max_body_bytes out of range".to_string()));
        }
        Ok(())
    }
}

impl SessionConfig {
    /// Validates the session section.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("session.signing_key_path", &self.signing_key_path)?;
        if !(MIN_SESSION_TTL_SECS..=MAX_SESSION_TTL_SECS).contains(&self.ttl_secs) {
            return Err(ConfigError::Invalid("session.ttl_secs out of range".to_string()));
        }
        if self.operators.is_empty() {
            return Err(ConfigError::Invalid(
                "session.operators requires at least one account".to_string(),
            ));
        }
        if self.operators.len() > MAX_OPERATORS {
            return Err(ConfigError::Invalid("too many operator accounts".to_string()));
        }
        for operator in &self.operators {
            operator.validate()?;
        }
        Ok(())
    }
}

impl OperatorConfig {
    /// Validates a single operator account.
    fn validate(&self) -> Result<(), ConfigError> {
        let username = self.username.trim();
        if username.is_empty() || username.len() > MAX_USERNAME_LENGTH {
            return Err(ConfigError::Invalid("operator username invalid".to_string()));
        }
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&self.password.len()) {
            return Err(ConfigError::Invalid("operator password length out of range".to_string()));
        }
        Ok(())
    }
}

impl ServiceConfig {
    /// Validates the service section.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CREDENTIAL_LENGTH..=MAX_CREDENTIAL_LENGTH).contains(&self.credential.len()) {
            return Err(ConfigError::Invalid(
                "service.credential length out of range".to_string(),
            ));
        }
        let origin = Url::parse(&self.internal_origin)
            .map_err(|_| ConfigError::Invalid("service.internal_origin invalid".to_string()))?;
        match origin.scheme() {
            "http" | "https" => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "service.internal_origin must be http or https".to_string(),
                ));
            }
        }
        if origin.host_str().is_none() {
            return Err(ConfigError::Invalid(
                "service.internal_origin requires a host".to_string(),
            ));
        }
        if origin.path() != "/" || origin.query().is_some() || origin.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "service.internal_origin must be an origin without path or query".to_string(),
            ));
        }
        if !(MIN_CONNECT_TIMEOUT_MS..=MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(
                "service.connect_timeout_ms out of range".to_string(),
            ));
        }
        if !(MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(
                "service.request_timeout_ms out of range".to_string(),
            ));
        }
        if self.max_redirects > MAX_REDIRECT_LIMIT {
            return Err(ConfigError::Invalid("service.max_redirects out of range".to_string()));
        }
        if !(MIN_BODY_BYTES..=MAX_BODY_BYTES).contains(&self.max_response_bytes) {
            return Err(ConfigError::Invalid(
                "service.max_response_bytes out of range".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the parsed internal origin.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the origin does not parse; `validate`
    /// rejects such configurations up front.
    pub fn origin(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.internal_origin)
            .map_err(|_| ConfigError::Invalid("service.internal_origin invalid".to_string()))
    }
}

impl ResourcesConfig {
    /// Validates the resources section.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.roots.is_empty() {
            return Err(ConfigError::Invalid(
                "resources.roots requires at least one root".to_string(),
            ));
        }
        if self.roots.len() > MAX_ROOTS {
            return Err(ConfigError::Invalid("too many resource roots".to_string()));
        }
        for (name, base) in &self.roots {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::Invalid(format!("resource root name '{name}' invalid")));
            }
            validate_path_string("resources.roots entry", base)?;
        }
        if self.max_file_bytes == 0 || self.max_file_bytes > MAX_FILE_BYTES {
            return Err(ConfigError::Invalid(
                "resources.max_file_bytes out of range".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the configured roots as name/path pairs.
    #[must_use]
    pub fn root_paths(&self) -> Vec<(String, PathBuf)> {
        self.roots.iter().map(|(name, base)| (name.clone(), PathBuf::from(base))).collect()
    }
}

// ============================================================================
// SECTION: Key Loading
// ============================================================================

/// Loads the Ed25519 session signing key from disk.
///
/// The file holds either 32 raw bytes or their base64 encoding.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is unreadable or malformed.
pub fn load_signing_key(path: &Path) -> Result<SigningKey, ConfigError> {
    let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    let key_bytes = if bytes.len() == 32 {
        bytes
    } else {
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("signing key must be utf-8 or raw".to_string()))?;
        Base64
            .decode(text.trim())
            .map_err(|_| ConfigError::Invalid("invalid base64 signing key".to_string()))?
    };
    let key_bytes: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| ConfigError::Invalid("signing key must be 32 bytes".to_string()))?;
    Ok(SigningKey::from_bytes(&key_bytes))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default bind address for the HTTP listener.
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Default maximum request body size in bytes.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default session TTL in seconds.
const fn default_session_ttl_secs() -> i64 {
    3_600
}

/// Default outbound connect timeout in milliseconds.
const fn default_connect_timeout_ms() -> u64 {
    500
}

/// Default outbound request timeout in milliseconds.
const fn default_request_timeout_ms() -> u64 {
    5_000
}

/// Default maximum served file size in bytes.
const fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem errors while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parse errors.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Validation failures.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
