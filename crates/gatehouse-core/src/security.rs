// crates/gatehouse-core/src/security.rs
// ============================================================================
// Module: Security Helpers
// Description: Constant-time comparison utilities for secret material.
// Purpose: Provide reusable, side-channel resistant comparisons.
// Dependencies: subtle
// ============================================================================

//! ## Overview
//! Exposes constant-time equality helpers for secret values such as the
//! service credential and operator passwords.
//!
//! Security posture: minimize timing side-channels when comparing secret
//! inputs.

use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constant-Time Comparisons
// ============================================================================

/// Compares two byte slices in constant time.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compares two strings in constant time.
#[must_use]
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, reason = "Test-only panic-based assertions.")]

    use super::constant_time_eq_str;

    #[test]
    fn equal_strings_match() {
        assert!(constant_time_eq_str("service-credential", "service-credential"));
    }

    #[test]
    fn unequal_strings_do_not_match() {
        assert!(!constant_time_eq_str("service-credential", "service-credentiaL"));
    }

    #[test]
    fn different_lengths_do_not_match() {
        assert!(!constant_time_eq_str("short", "short-but-longer"));
    }
}
