// crates/warden-core/src/core/errors.rs
// ============================================================================
// Module: Warden Error Taxonomy
// Description: Stable error codes shared by responses and audit metadata.
// Purpose: Give every pipeline rejection and dispatch failure one canonical code.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The error taxonomy is a closed set. Codes appear verbatim in response
//! `error.code` fields and in audit `rejectionReason` metadata, so their wire
//! forms are stable SCREAMING_SNAKE strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Canonical error codes for pipeline rejections and dispatch failures.
///
/// # Invariants
/// - Wire forms are stable; new codes extend the set, existing codes never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Request envelope is malformed.
    #[serde(rename = "SCHEMA_INVALID")]
    SchemaInvalid,
    /// Per-action payload is malformed.
    #[serde(rename = "PAYLOAD_INVALID")]
    PayloadInvalid,
    /// Request identifier was already accepted within the replay window.
    #[serde(rename = "REPLAY_DETECTED")]
    ReplayDetected,
    /// HMAC signature mismatch.
    #[serde(rename = "SIGNATURE_INVALID")]
    SignatureInvalid,
    /// Target domain is not on the active allowlist.
    #[serde(rename = "DOMAIN_NOT_ALLOWED")]
    DomainNotAllowed,
    /// Per-action or global rate cap reached.
    #[serde(rename = "RATE_LIMITED")]
    RateLimited,
    /// Oversize payload, burst, or first-seen domain.
    #[serde(rename = "ANOMALY_DETECTED")]
    AnomalyDetected,
    /// No adapter registered for the action kind.
    #[serde(rename = "NO_ADAPTER")]
    NoAdapter,
    /// Adapter reported a failure.
    #[serde(rename = "ADAPTER_ERROR")]
    AdapterError,
    /// Dispatch deadline expired.
    #[serde(rename = "TIMEOUT")]
    Timeout,
    /// Transport disconnection or shutdown cancelled the request.
    #[serde(rename = "CANCELLED")]
    Cancelled,
    /// Audit append failed; the request cannot be accounted for.
    #[serde(rename = "AUDIT_WRITE_FAILED")]
    AuditWriteFailed,
}

impl ErrorCode {
    /// Returns the stable wire form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SchemaInvalid => "SCHEMA_INVALID",
            Self::PayloadInvalid => "PAYLOAD_INVALID",
            Self::ReplayDetected => "REPLAY_DETECTED",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            Self::RateLimited => "RATE_LIMITED",
            Self::AnomalyDetected => "ANOMALY_DETECTED",
            Self::NoAdapter => "NO_ADAPTER",
            Self::AdapterError => "ADAPTER_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::AuditWriteFailed => "AUDIT_WRITE_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
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
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::ErrorCode;

    /// Tests wire forms match serde rename values.
    #[test]
    fn test_wire_form_matches_serde() {
        let json = serde_json::to_string(&ErrorCode::SignatureInvalid).unwrap();
        assert_eq!(json, "\"SIGNATURE_INVALID\"");
        assert_eq!(ErrorCode::SignatureInvalid.as_str(), "SIGNATURE_INVALID");
    }
}
