// crates/gatehouse-core/src/sandbox.rs
// ============================================================================
// Module: Sandboxed Resource Resolver
// Description: Maps logical paths onto permitted filesystem roots.
// Purpose: Guarantee resolved paths never escape their declared root.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The resolver maps a caller-supplied `root/relative/path` string to a
//! canonical filesystem path under exactly one registered root. Inputs are
//! screened lexically (no traversal components, bounded lengths) before any
//! filesystem access, then the joined path is canonicalized and checked for
//! containment component-wise against the canonicalized root. A raw string
//! prefix is never used: `/app/reports` must not admit
//! `/app/reports-backup/secret.txt`.
//!
//! Containment violations report a uniform "invalid path" failure without
//! echoing the canonicalized path. The canonical path returned by a
//! successful resolution is the path that gets opened; nothing re-resolves
//! the caller's string between check and use.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::GatewayError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a logical path string.
const MAX_LOGICAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Immutable mapping from logical root names to permitted base directories.
///
/// Base directories are canonicalized once at construction; the registry is
/// read-only afterwards and safe to share across concurrent requests.
pub struct RootRegistry {
    /// Canonicalized base directory per root name.
    roots: BTreeMap<String, PathBuf>,
}

/// Errors raised while building a root registry.
#[derive(Debug, Error)]
pub enum RootRegistryError {
    /// A configured root name is empty or contains a separator.
    #[error("invalid root name: {0}")]
    InvalidName(String),
    /// A configured base directory cannot be canonicalized.
    #[error("root '{0}' has an unusable base directory")]
    UnusableBase(String),
    /// A configured base path is not a directory.
    #[error("root '{0}' base path is not a directory")]
    NotADirectory(String),
}

impl RootRegistry {
    /// Builds a registry from configured root-name to base-directory pairs.
    ///
    /// # Errors
    ///
    /// Returns [`RootRegistryError`] when a name is malformed or a base
    /// directory is missing or not a directory.
    pub fn new(
        configured: impl IntoIterator<Item = (String, PathBuf)>,
    ) -> Result<Self, RootRegistryError> {
        let mut roots = BTreeMap::new();
        for (name, base) in configured {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(RootRegistryError::InvalidName(name));
            }
            let canonical = base
                .canonicalize()
                .map_err(|_| RootRegistryError::UnusableBase(name.clone()))?;
            if !canonical.is_dir() {
                return Err(RootRegistryError::NotADirectory(name));
            }
            roots.insert(name, canonical);
        }
        Ok(Self {
            roots,
        })
    }

    /// Returns the registered root names in sorted order.
    #[must_use]
    pub fn root_names(&self) -> Vec<&str> {
        self.roots.keys().map(String::as_str).collect()
    }

    /// Resolves a caller-supplied logical path to a contained regular file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BadRequest`] for empty input, unknown roots,
    /// traversal attempts, containment violations, or non-regular targets,
    /// and [`GatewayError::NotFound`] when the contained target is absent.
    pub fn resolve(&self, logical: &str) -> Result<ResolvedResource, GatewayError> {
        let logical = logical.trim();
        if logical.is_empty() {
            return Err(GatewayError::BadRequest("path parameter required".to_string()));
        }
        if logical.len() > MAX_LOGICAL_PATH_LENGTH {
            return Err(invalid_path());
        }
        let (root_name, remainder) = logical
            .split_once('/')
            .ok_or_else(|| GatewayError::BadRequest(
                "path must name a file within a root".to_string(),
            ))?;
        let base = self.roots.get(root_name).ok_or_else(|| {
            GatewayError::BadRequest(format!(
                "unknown root '{root_name}'; allowed roots: {}",
                self.root_names().join(", ")
            ))
        })?;
        screen_remainder(remainder)?;

        // Canonicalization resolves symlinks and `..` in one step; the result
        // is compared component-wise against the canonical base.
        let candidate = base.join(remainder);
        let canonical = match candidate.canonicalize() {
            Ok(path) => path,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(GatewayError::NotFound("file not found".to_string()));
            }
            Err(_) => return Err(invalid_path()),
        };
        if canonical == *base || !canonical.starts_with(base) {
            return Err(invalid_path());
        }
        let metadata = fs::metadata(&canonical).map_err(|_| invalid_path())?;
        if !metadata.is_file() {
            return Err(GatewayError::BadRequest("path is not a regular file".to_string()));
        }
        let file_name = canonical
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(invalid_path)?;
        Ok(ResolvedResource {
            path: canonical,
            file_name,
            size: metadata.len(),
        })
    }
}

/// A successfully resolved, contained regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    /// Canonical filesystem path; open this path, never re-resolve the input.
    pub path: PathBuf,
    /// Base file name, safe to reflect into response headers.
    pub file_name: String,
    /// File size in bytes at resolution time.
    pub size: u64,
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

/// Reads a resolved resource while enforcing a byte limit.
///
/// # Errors
///
/// Returns [`GatewayError::BadRequest`] when the file exceeds the limit and
/// [`GatewayError::Internal`] when the read fails.
pub fn read_resource_limited(
    resource: &ResolvedResource,
    max_bytes: u64,
) -> Result<Vec<u8>, GatewayError> {
    if resource.size > max_bytes {
        return Err(GatewayError::BadRequest("file exceeds size limit".to_string()));
    }
    let file = fs::File::open(&resource.path).map_err(|err| GatewayError::Internal {
        detail: format!("resource open failed: {err}"),
    })?;
    let mut buf = Vec::new();
    let mut handle = file.take(max_bytes.saturating_add(1));
    handle.read_to_end(&mut buf).map_err(|err| GatewayError::Internal {
        detail: format!("resource read failed: {err}"),
    })?;
    if buf.len() as u64 > max_bytes {
        return Err(GatewayError::BadRequest("file exceeds size limit".to_string()));
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Screens the relative remainder lexically before any filesystem access.
fn screen_remainder(remainder: &str) -> Result<(), GatewayError> {
    if remainder.trim().is_empty() || remainder.contains('\\') {
        return Err(invalid_path());
    }
    for component in Path::new(remainder).components() {
        match component {
            Component::Normal(value) => {
                if value.to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
                    return Err(invalid_path());
                }
            }
            // `.`/`..`/absolute components never reach the filesystem.
            _ => return Err(invalid_path()),
        }
    }
    Ok(())
}

/// Builds the uniform containment failure without path detail.
fn invalid_path() -> GatewayError {
    GatewayError::BadRequest("invalid path".to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
