// crates/warden-core/src/core/identifiers.rs
// ============================================================================
// Module: Warden Identifiers
// Description: Canonical identifiers for requests and authorized domains.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the identifiers shared by Core and Gateway. Request
//! identifiers are opaque client-chosen tokens bounded at construction;
//! domains are normalized to lowercase so allowlist lookups are
//! case-insensitive. Both serialize transparently as strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a client-chosen request identifier in bytes.
pub const MAX_REQUEST_ID_BYTES: usize = 128;
/// Maximum length of a domain name in bytes.
pub const MAX_DOMAIN_BYTES: usize = 253;

// ============================================================================
// SECTION: Request Identifier
// ============================================================================

/// Client-chosen request identifier, unique within the replay window.
///
/// # Invariants
/// - Non-empty and at most [`MAX_REQUEST_ID_BYTES`] bytes.
/// - Opaque: no structure is assumed beyond uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

/// Errors raised when constructing a [`RequestId`].
#[derive(Debug, Error)]
pub enum RequestIdError {
    /// Identifier is empty.
    #[error("request id is empty")]
    Empty,
    /// Identifier exceeds the length bound.
    #[error("request id too long: {actual} bytes (max {max})")]
    TooLong {
        /// Actual identifier length in bytes.
        actual: usize,
        /// Maximum permitted length in bytes.
        max: usize,
    },
}

impl RequestId {
    /// Creates a request identifier after bounds checks.
    ///
    /// # Errors
    ///
    /// Returns [`RequestIdError`] when the token is empty or too long.
    pub fn new(id: impl Into<String>) -> Result<Self, RequestIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RequestIdError::Empty);
        }
        if id.len() > MAX_REQUEST_ID_BYTES {
            return Err(RequestIdError::TooLong {
                actual: id.len(),
                max: MAX_REQUEST_ID_BYTES,
            });
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Domain
// ============================================================================

/// Normalized domain name used as the allowlist authorization key.
///
/// # Invariants
/// - Lowercase ASCII; normalized at construction.
/// - Non-empty, at most [`MAX_DOMAIN_BYTES`] bytes, no whitespace or slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

/// Errors raised when constructing a [`Domain`].
#[derive(Debug, Error)]
pub enum DomainError {
    /// Domain is empty.
    #[error("domain is empty")]
    Empty,
    /// Domain exceeds the length bound.
    #[error("domain too long: {actual} bytes (max {max})")]
    TooLong {
        /// Actual domain length in bytes.
        actual: usize,
        /// Maximum permitted length in bytes.
        max: usize,
    },
    /// Domain contains characters outside the hostname alphabet.
    #[error("domain contains invalid characters")]
    InvalidCharacters,
}

impl Domain {
    /// Creates a normalized domain after validation.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] when the input is empty, too long, or contains
    /// characters outside `[a-z0-9.-]` after lowercasing.
    pub fn new(domain: impl Into<String>) -> Result<Self, DomainError> {
        let domain = domain.into().trim().to_ascii_lowercase();
        if domain.is_empty() {
            return Err(DomainError::Empty);
        }
        if domain.len() > MAX_DOMAIN_BYTES {
            return Err(DomainError::TooLong {
                actual: domain.len(),
                max: MAX_DOMAIN_BYTES,
            });
        }
        if !domain.bytes().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'.' || byte == b'-') {
            return Err(DomainError::InvalidCharacters);
        }
        Ok(Self(domain))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Identity label used for per-identity rate and burst tracking.
///
/// A single Core connects at a time, so the identity is currently always
/// [`CORE_IDENTITY`]; the key shape is kept for multi-account futures.
pub const CORE_IDENTITY: &str = "core";

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::Domain;
    use super::MAX_REQUEST_ID_BYTES;
    use super::RequestId;

    /// Tests request id bounds are enforced.
    #[test]
    fn test_request_id_bounds() {
        assert!(RequestId::new("r1").is_ok());
        assert!(RequestId::new("").is_err());
        assert!(RequestId::new("x".repeat(MAX_REQUEST_ID_BYTES + 1)).is_err());
    }

    /// Tests domain normalization lowercases input.
    #[test]
    fn test_domain_normalizes_case() {
        let domain = Domain::new("API.Example.COM").unwrap();
        assert_eq!(domain.as_str(), "api.example.com");
    }

    /// Tests domain rejects invalid characters.
    #[test]
    fn test_domain_rejects_invalid_characters() {
        assert!(Domain::new("evil.example.com/path").is_err());
        assert!(Domain::new("host name").is_err());
        assert!(Domain::new("").is_err());
    }
}
