// crates/warden-core/src/core/audit.rs
// ============================================================================
// Module: Warden Audit Record
// Description: Hash-chained, append-only audit entry model.
// Purpose: Define the tamper-evident record and its single chain-hash function.
// Dependencies: crate::core::{hashing, time}, serde
// ============================================================================

//! ## Overview
//! Audit entries are created by the pipeline, never mutated, never deleted.
//! Each entry binds to all prior entries through `chainHash`; the computation
//! lives in exactly one function here so every writer and the verifier agree
//! on the bytes. The first entry chains from the empty string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::sha256_hex;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Direction and Status
// ============================================================================

/// Direction of an audit entry relative to the request flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDirection {
    /// Entry records an accepted request before dispatch.
    Request,
    /// Entry records the outcome returned to Core.
    Response,
}

impl AuditDirection {
    /// Returns the stable wire form of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

/// Status recorded in an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Request accepted, dispatch not yet complete.
    Pending,
    /// Dispatch succeeded.
    Success,
    /// Dispatch or pipeline failed.
    Error,
    /// Pipeline rejected the request before dispatch.
    Rejected,
    /// Request exceeded a rate cap.
    RateLimited,
    /// Request flagged for user approval.
    RequiresApproval,
}

impl AuditStatus {
    /// Returns the stable wire form of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
            Self::Rejected => "rejected",
            Self::RateLimited => "rate_limited",
            Self::RequiresApproval => "requires_approval",
        }
    }
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Structured audit metadata; credential material is never placed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AuditMetadata {
    /// Canonical code of the rejection, for rejected entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Detector reason codes, for anomaly rejections.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    /// Target domain, for allowlist and anomaly records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Originator of an allowlist mutation (`user` or `system`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
    /// Estimated user time saved by the action, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_saved_ms: Option<u64>,
}

impl AuditMetadata {
    /// Returns metadata carrying only a rejection reason.
    #[must_use]
    pub fn rejection(reason: &str) -> Self {
        Self {
            rejection_reason: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Returns true when no field is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rejection_reason.is_none()
            && self.reasons.is_empty()
            && self.domain.is_none()
            && self.added_by.is_none()
            && self.estimated_time_saved_ms.is_none()
    }
}

// ============================================================================
// SECTION: Audit Entry
// ============================================================================

/// Append-only audit record.
///
/// # Invariants
/// - `chain_hash` equals [`chain_hash`] over the predecessor's chain hash and
///   this entry's identity fields.
/// - Entries are immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AuditEntry {
    /// Stable entry identifier.
    pub id: String,
    /// Identifier of the request this entry belongs to.
    pub request_id: String,
    /// Entry timestamp, RFC 3339.
    pub timestamp: Timestamp,
    /// Action name; pipeline kinds or gateway-internal actions.
    pub action: String,
    /// Entry direction.
    pub direction: AuditDirection,
    /// Entry status.
    pub status: AuditStatus,
    /// SHA-256 hex of the canonical request payload.
    pub payload_hash: String,
    /// Request signature copied verbatim; empty for gateway-internal entries.
    pub signature: String,
    /// Hash binding this entry to all prior entries.
    pub chain_hash: String,
    /// Structured metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AuditMetadata>,
    /// Dispatch duration in milliseconds, for response entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

// ============================================================================
// SECTION: Chain Hash
// ============================================================================

/// Computes the chain hash binding an entry to its predecessor.
///
/// The input is the concatenation `prev || id || timestamp || action ||
/// direction || status || payloadHash` with no separators; `prev` is the
/// predecessor's chain hash, or the empty string for the first entry.
#[must_use]
pub fn chain_hash(
    prev: &str,
    id: &str,
    timestamp: &Timestamp,
    action: &str,
    direction: AuditDirection,
    status: AuditStatus,
    payload_hash: &str,
) -> String {
    let mut input = String::with_capacity(
        prev.len() + id.len() + timestamp.as_str().len() + action.len() + payload_hash.len() + 32,
    );
    input.push_str(prev);
    input.push_str(id);
    input.push_str(timestamp.as_str());
    input.push_str(action);
    input.push_str(direction.as_str());
    input.push_str(status.as_str());
    input.push_str(payload_hash);
    sha256_hex(input.as_bytes())
}

/// Recomputes an entry's chain hash from a predecessor hash.
#[must_use]
pub fn entry_chain_hash(prev: &str, entry: &AuditEntry) -> String {
    chain_hash(
        prev,
        &entry.id,
        &entry.timestamp,
        &entry.action,
        entry.direction,
        entry.status,
        &entry.payload_hash,
    )
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

    use super::AuditDirection;
    use super::AuditEntry;
    use super::AuditMetadata;
    use super::AuditStatus;
    use super::chain_hash;
    use super::entry_chain_hash;
    use crate::core::time::Timestamp;

    /// Builds an entry with a computed chain hash for tests.
    fn sample_entry(prev: &str, id: &str) -> AuditEntry {
        let timestamp = Timestamp::parse("2026-02-20T10:00:00Z").unwrap();
        let hash = chain_hash(
            prev,
            id,
            &timestamp,
            "email.send",
            AuditDirection::Request,
            AuditStatus::Pending,
            "ph",
        );
        AuditEntry {
            id: id.to_string(),
            request_id: "r1".to_string(),
            timestamp,
            action: "email.send".to_string(),
            direction: AuditDirection::Request,
            status: AuditStatus::Pending,
            payload_hash: "ph".to_string(),
            signature: String::new(),
            chain_hash: hash,
            metadata: None,
            duration_ms: None,
        }
    }

    /// Tests the chain hash is deterministic and predecessor-sensitive.
    #[test]
    fn test_chain_hash_binds_predecessor() {
        let first = sample_entry("", "a1");
        let second = sample_entry(&first.chain_hash, "a2");
        assert_eq!(entry_chain_hash("", &first), first.chain_hash);
        assert_eq!(entry_chain_hash(&first.chain_hash, &second), second.chain_hash);
        assert_ne!(first.chain_hash, second.chain_hash);
    }

    /// Tests any field mutation breaks the recomputed hash.
    #[test]
    fn test_field_mutation_breaks_chain() {
        let entry = sample_entry("", "a1");
        let mut tampered = entry.clone();
        tampered.status = AuditStatus::Success;
        assert_ne!(entry_chain_hash("", &tampered), entry.chain_hash);
        let mut tampered = entry.clone();
        tampered.payload_hash = "other".to_string();
        assert_ne!(entry_chain_hash("", &tampered), entry.chain_hash);
    }

    /// Tests metadata emptiness helper.
    #[test]
    fn test_metadata_is_empty() {
        assert!(AuditMetadata::default().is_empty());
        assert!(!AuditMetadata::rejection("SIGNATURE_INVALID").is_empty());
    }

    /// Tests entries serialize with camelCase wire names.
    #[test]
    fn test_wire_shape_is_camel_case() {
        let entry = sample_entry("", "a1");
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("payloadHash").is_some());
        assert!(value.get("chainHash").is_some());
        assert!(value.get("requestId").is_some());
    }
}
