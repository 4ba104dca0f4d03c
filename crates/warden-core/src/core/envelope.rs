// crates/warden-core/src/core/envelope.rs
// ============================================================================
// Module: Warden Request Envelope
// Description: Wire shapes for action requests and responses.
// Purpose: Decode, schema-check, and assemble requests; build typed responses.
// Dependencies: crate::core::{actions, errors, identifiers, payloads, signing, time}
// ============================================================================

//! ## Overview
//! The envelope is the raw wire object Core submits. Decoding is strict:
//! unknown envelope fields are schema violations. Schema checking and payload
//! validation are separate steps so the pipeline can attribute a failure to
//! the correct stage and error code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::actions::ActionKind;
use crate::core::errors::ErrorCode;
use crate::core::identifiers::RequestId;
use crate::core::payloads::ActionPayload;
use crate::core::payloads::PayloadError;
use crate::core::signing::SigningError;
use crate::core::signing::SigningKey;
use crate::core::signing::sign_request;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Required literal for the envelope `source` field.
pub const REQUEST_SOURCE: &str = "core";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while decoding or schema-checking an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Envelope bytes are not a conforming JSON object.
    #[error("envelope malformed: {0}")]
    Malformed(String),
    /// Envelope `source` is not the expected literal.
    #[error("envelope source must be \"{REQUEST_SOURCE}\", got \"{0}\"")]
    Source(String),
    /// Envelope `id` violates request-id bounds.
    #[error("envelope id invalid: {0}")]
    Id(String),
    /// Envelope `timestamp` is not RFC 3339.
    #[error("envelope timestamp invalid: {0}")]
    Timestamp(String),
    /// Envelope `action` is not in the closed set.
    #[error("unknown action kind: {0}")]
    UnknownAction(String),
}

// ============================================================================
// SECTION: Request Envelope
// ============================================================================

/// Raw request envelope as submitted by Core.
///
/// # Invariants
/// - Field set is closed; decoding rejects unknown fields.
/// - `payload` is kept as raw JSON until the payload stage selects its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestEnvelope {
    /// Client-chosen unique token (replay key).
    pub id: String,
    /// RFC 3339 instant.
    pub timestamp: String,
    /// Action discriminator.
    pub action: String,
    /// Raw payload, validated against the per-kind schema later.
    pub payload: Value,
    /// Source literal; always `"core"`.
    pub source: String,
    /// 64-hex-char HMAC-SHA256 over the canonical signing payload.
    pub signature: String,
}

/// Schema-checked envelope head: typed id, timestamp, and action kind.
#[derive(Debug, Clone)]
pub struct EnvelopeHead {
    /// Validated request identifier.
    pub id: RequestId,
    /// Parsed request timestamp.
    pub timestamp: Timestamp,
    /// Resolved action kind.
    pub kind: ActionKind,
}

impl RequestEnvelope {
    /// Decodes an envelope from raw frame bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] when the bytes are not a
    /// conforming JSON object.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|err| EnvelopeError::Malformed(err.to_string()))
    }

    /// Checks envelope conformance and resolves the typed head.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when a required field is missing its
    /// contract: bad source literal, invalid id, non-RFC-3339 timestamp, or
    /// an action outside the closed set.
    pub fn check_schema(&self) -> Result<EnvelopeHead, EnvelopeError> {
        if self.source != REQUEST_SOURCE {
            return Err(EnvelopeError::Source(self.source.clone()));
        }
        let id =
            RequestId::new(self.id.clone()).map_err(|err| EnvelopeError::Id(err.to_string()))?;
        let timestamp = Timestamp::parse(&self.timestamp)
            .map_err(|err| EnvelopeError::Timestamp(err.to_string()))?;
        let kind = ActionKind::parse(&self.action)
            .ok_or_else(|| EnvelopeError::UnknownAction(self.action.clone()))?;
        Ok(EnvelopeHead { id, timestamp, kind })
    }

    /// Builds a signed envelope for the client side of the contract.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] when the payload cannot be canonicalized.
    pub fn signed(
        key: &SigningKey,
        id: &str,
        timestamp: &str,
        kind: ActionKind,
        payload: Value,
    ) -> Result<Self, SigningError> {
        let signature = sign_request(key, id, timestamp, kind.as_str(), &payload)?;
        Ok(Self {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            action: kind.as_str().to_string(),
            payload,
            source: REQUEST_SOURCE.to_string(),
            signature,
        })
    }
}

// ============================================================================
// SECTION: Action Request
// ============================================================================

/// Fully validated action request: schema-checked head plus typed payload.
///
/// # Invariants
/// - `payload.kind() == kind`.
/// - `payload_value` is the exact wire payload the signature covers.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// Validated request identifier.
    pub id: RequestId,
    /// Parsed request timestamp.
    pub timestamp: Timestamp,
    /// Resolved action kind.
    pub kind: ActionKind,
    /// Typed payload record.
    pub payload: ActionPayload,
    /// Raw wire payload, preserved for signing and hashing.
    pub payload_value: Value,
    /// Request signature as submitted.
    pub signature: String,
}

impl ActionRequest {
    /// Assembles a request from a schema-checked head and its envelope.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when the payload fails the per-kind schema.
    pub fn assemble(head: EnvelopeHead, envelope: &RequestEnvelope) -> Result<Self, PayloadError> {
        let payload = ActionPayload::parse(head.kind, &envelope.payload)?;
        Ok(Self {
            id: head.id,
            timestamp: head.timestamp,
            kind: head.kind,
            payload,
            payload_value: envelope.payload.clone(),
            signature: envelope.signature.clone(),
        })
    }
}

// ============================================================================
// SECTION: Action Response
// ============================================================================

/// Response status returned to Core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Request executed successfully.
    Success,
    /// Request failed; `error` carries the code.
    Error,
    /// Request needs explicit user approval before resubmission.
    RequiresApproval,
    /// Request exceeded a rate cap.
    RateLimited,
}

/// Structured response error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseError {
    /// Canonical error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Response returned to Core for a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ActionResponse {
    /// Identifier of the request being answered.
    pub request_id: String,
    /// Response timestamp, RFC 3339.
    pub timestamp: Timestamp,
    /// Response status.
    pub status: ResponseStatus,
    /// Adapter result data on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Structured error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
    /// Audit entry id of the response record, when one was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_ref: Option<String>,
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

    use serde_json::json;

    use super::ActionRequest;
    use super::RequestEnvelope;
    use crate::core::actions::ActionKind;
    use crate::core::signing::SigningKey;
    use crate::core::signing::verify_signature;

    /// Builds a conforming envelope JSON object for tests.
    fn sample_envelope() -> serde_json::Value {
        json!({
            "id": "r1",
            "timestamp": "2026-02-20T10:00:00Z",
            "action": "email.send",
            "payload": {"to": ["a@b.com"], "subject": "Hi", "body": "Hello"},
            "source": "core",
            "signature": "0".repeat(64)
        })
    }

    /// Tests a conforming envelope decodes and schema-checks.
    #[test]
    fn test_envelope_decodes_and_checks() {
        let bytes = serde_json::to_vec(&sample_envelope()).unwrap();
        let envelope = RequestEnvelope::decode(&bytes).unwrap();
        let head = envelope.check_schema().unwrap();
        assert_eq!(head.kind, ActionKind::EmailSend);
        let request = ActionRequest::assemble(head, &envelope).unwrap();
        assert_eq!(request.id.as_str(), "r1");
    }

    /// Tests unknown envelope fields are rejected at decode.
    #[test]
    fn test_unknown_envelope_field_rejected() {
        let mut value = sample_envelope();
        value["extra"] = json!(true);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(RequestEnvelope::decode(&bytes).is_err());
    }

    /// Tests missing envelope fields are rejected at decode.
    #[test]
    fn test_missing_envelope_field_rejected() {
        let mut value = sample_envelope();
        value.as_object_mut().unwrap().remove("signature");
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(RequestEnvelope::decode(&bytes).is_err());
    }

    /// Tests the source literal is enforced.
    #[test]
    fn test_source_literal_enforced() {
        let mut value = sample_envelope();
        value["source"] = json!("gateway");
        let bytes = serde_json::to_vec(&value).unwrap();
        let envelope = RequestEnvelope::decode(&bytes).unwrap();
        assert!(envelope.check_schema().is_err());
    }

    /// Tests unknown action kinds fail schema checking.
    #[test]
    fn test_unknown_action_rejected() {
        let mut value = sample_envelope();
        value["action"] = json!("email.exfiltrate");
        let bytes = serde_json::to_vec(&value).unwrap();
        let envelope = RequestEnvelope::decode(&bytes).unwrap();
        assert!(envelope.check_schema().is_err());
    }

    /// Tests client-side signing produces a verifiable envelope.
    #[test]
    fn test_signed_envelope_verifies() {
        let key = SigningKey::generate();
        let payload = json!({"query": "rust", "maxResults": 3});
        let envelope = RequestEnvelope::signed(
            &key,
            "r9",
            "2026-02-20T10:00:00Z",
            ActionKind::WebSearch,
            payload.clone(),
        )
        .unwrap();
        assert!(
            verify_signature(
                &key,
                "r9",
                "2026-02-20T10:00:00Z",
                "web.search",
                &payload,
                &envelope.signature
            )
            .unwrap()
        );
    }
}
