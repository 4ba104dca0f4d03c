// crates/warden-core/src/core/signing.rs
// ============================================================================
// Module: Warden Signing Protocol
// Description: Deterministic canonicalization and HMAC-SHA256 request signing.
// Purpose: Bind each request to the shared key so the Gateway can authenticate Core.
// Dependencies: crate::core::hashing, hmac, rand, sha2, subtle
// ============================================================================

//! ## Overview
//! The signing payload is the concatenation `id || timestamp || action ||
//! canonicalJSON(payload)`; the signature is HMAC-SHA256 over those bytes,
//! lowercase hex. Verification recomputes the MAC and compares in constant
//! time so near-miss signatures cannot be distinguished by timing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use hmac::Hmac;
use hmac::Mac;
use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::core::hashing::canonical_json_string;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length of the shared signing key in bytes.
pub const SIGNING_KEY_BYTES: usize = 32;
/// Length of a hex-encoded HMAC-SHA256 signature.
pub const SIGNATURE_HEX_CHARS: usize = 64;

/// HMAC-SHA256 instantiation used for request signatures.
type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the signing protocol.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Key material has the wrong length.
    #[error("signing key must be {expected} bytes, got {actual}")]
    KeyLength {
        /// Expected key length in bytes.
        expected: usize,
        /// Actual key length in bytes.
        actual: usize,
    },
    /// Payload canonicalization failed.
    #[error("failed to canonicalize signing payload: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Signing Key
// ============================================================================

/// Shared symmetric signing key.
///
/// # Invariants
/// - Exactly [`SIGNING_KEY_BYTES`] bytes.
/// - Never printed; the `Debug` form is redacted.
#[derive(Clone)]
pub struct SigningKey([u8; SIGNING_KEY_BYTES]);

impl SigningKey {
    /// Generates a fresh random key from the OS entropy source.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SIGNING_KEY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::KeyLength`] when the slice is not exactly
    /// [`SIGNING_KEY_BYTES`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigningError> {
        let array: [u8; SIGNING_KEY_BYTES] =
            bytes.try_into().map_err(|_| SigningError::KeyLength {
                expected: SIGNING_KEY_BYTES,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIGNING_KEY_BYTES] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(redacted)")
    }
}

// ============================================================================
// SECTION: Canonical Signing Payload
// ============================================================================

/// Builds the canonical signing payload for a request.
///
/// The payload is `id || timestamp || action || canonicalJSON(payload)` with
/// no separators; canonical JSON follows RFC 8785.
///
/// # Errors
///
/// Returns [`SigningError::Canonicalization`] when the payload cannot be
/// canonicalized.
pub fn canonical_signing_payload(
    id: &str,
    timestamp: &str,
    action: &str,
    payload: &Value,
) -> Result<String, SigningError> {
    let canonical = canonical_json_string(payload)
        .map_err(|err| SigningError::Canonicalization(err.to_string()))?;
    let mut out = String::with_capacity(id.len() + timestamp.len() + action.len() + canonical.len());
    out.push_str(id);
    out.push_str(timestamp);
    out.push_str(action);
    out.push_str(&canonical);
    Ok(out)
}

// ============================================================================
// SECTION: Sign / Verify
// ============================================================================

/// Signs a request, returning the lowercase-hex HMAC-SHA256 signature.
///
/// # Errors
///
/// Returns [`SigningError`] when canonicalization fails.
pub fn sign_request(
    key: &SigningKey,
    id: &str,
    timestamp: &str,
    action: &str,
    payload: &Value,
) -> Result<String, SigningError> {
    let mac = compute_mac(key, id, timestamp, action, payload)?;
    Ok(hex_encode(&mac))
}

/// Verifies a request signature in constant time.
///
/// Malformed signatures (wrong length, non-hex characters) verify as false
/// rather than erroring, so the caller always maps a mismatch to one code.
///
/// # Errors
///
/// Returns [`SigningError`] when canonicalization fails.
pub fn verify_signature(
    key: &SigningKey,
    id: &str,
    timestamp: &str,
    action: &str,
    payload: &Value,
    signature: &str,
) -> Result<bool, SigningError> {
    let expected = compute_mac(key, id, timestamp, action, payload)?;
    let Some(provided) = hex_decode(signature) else {
        return Ok(false);
    };
    Ok(expected.ct_eq(provided.as_slice()).into())
}

/// Computes the raw HMAC-SHA256 bytes for a request.
fn compute_mac(
    key: &SigningKey,
    id: &str,
    timestamp: &str,
    action: &str,
    payload: &Value,
) -> Result<Vec<u8>, SigningError> {
    let canonical = canonical_signing_payload(id, timestamp, action, payload)?;
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|err| SigningError::Canonicalization(err.to_string()))?;
    mac.update(canonical.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Decodes a lowercase or uppercase hex string of signature length.
fn hex_decode(input: &str) -> Option<Vec<u8>> {
    if input.len() != SIGNATURE_HEX_CHARS {
        return None;
    }
    let mut out = Vec::with_capacity(input.len() / 2);
    let bytes = input.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let high = hex_nibble(pair[0])?;
        let low = hex_nibble(pair[1])?;
        out.push((high << 4) | low);
    }
    Some(out)
}

/// Decodes a single hex nibble.
const fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
