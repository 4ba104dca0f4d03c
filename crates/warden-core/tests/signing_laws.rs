// crates/warden-core/tests/signing_laws.rs
// ============================================================================
// Module: Signing Law Tests
// Description: Property tests for canonicalization and signature laws.
// ============================================================================
//! ## Overview
//! Validates that signatures are invariant under payload key permutation and
//! that verification accepts exactly the signatures produced by the paired key.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use proptest::prelude::*;
use serde_json::Map;
use serde_json::Value;
use warden_core::SigningKey;
use warden_core::canonical_json_string;
use warden_core::sign_request;
use warden_core::verify_signature;

// ============================================================================
// SECTION: Generators
// ============================================================================

/// Generates a JSON leaf value.
fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 _.-]{0,24}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

/// Generates a flat JSON object with distinct keys.
fn flat_object() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("[a-zA-Z][a-zA-Z0-9_]{0,12}", leaf_value(), 0..8)
        .prop_map(|map| map.into_iter().collect())
}

/// Reverses the key order of a JSON object.
fn reversed(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map.iter().rev() {
        out.insert(key.clone(), value.clone());
    }
    out
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    /// Canonicalization is insensitive to object key order.
    #[test]
    fn prop_canonical_form_order_insensitive(map in flat_object()) {
        let forward = canonical_json_string(&Value::Object(map.clone())).unwrap();
        let backward = canonical_json_string(&Value::Object(reversed(&map))).unwrap();
        prop_assert_eq!(forward, backward);
    }

    /// Signatures are invariant under payload key permutation.
    #[test]
    fn prop_signature_order_insensitive(map in flat_object()) {
        let key = SigningKey::from_bytes(&[42u8; 32]).unwrap();
        let forward = sign_request(
            &key,
            "r1",
            "2026-02-20T10:00:00Z",
            "service.api_call",
            &Value::Object(map.clone()),
        )
        .unwrap();
        let backward = sign_request(
            &key,
            "r1",
            "2026-02-20T10:00:00Z",
            "service.api_call",
            &Value::Object(reversed(&map)),
        )
        .unwrap();
        prop_assert_eq!(forward, backward);
    }

    /// Sign/verify round-trips with the same key and fails with another.
    #[test]
    fn prop_sign_verify_laws(map in flat_object(), seed in any::<u8>()) {
        let key = SigningKey::from_bytes(&[seed; 32]).unwrap();
        let other = SigningKey::from_bytes(&[seed.wrapping_add(1); 32]).unwrap();
        let payload = Value::Object(map);
        let signature =
            sign_request(&key, "r1", "2026-02-20T10:00:00Z", "web.search", &payload).unwrap();
        prop_assert!(verify_signature(
            &key,
            "r1",
            "2026-02-20T10:00:00Z",
            "web.search",
            &payload,
            &signature
        )
        .unwrap());
        prop_assert!(!verify_signature(
            &other,
            "r1",
            "2026-02-20T10:00:00Z",
            "web.search",
            &payload,
            &signature
        )
        .unwrap());
    }

    /// Random near-miss signatures never verify.
    #[test]
    fn prop_near_miss_signatures_rejected(map in flat_object(), position in 0usize..64) {
        let key = SigningKey::from_bytes(&[7u8; 32]).unwrap();
        let payload = Value::Object(map);
        let signature =
            sign_request(&key, "r1", "2026-02-20T10:00:00Z", "web.fetch", &payload).unwrap();
        let mut bytes = signature.into_bytes();
        bytes[position] = if bytes[position] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(bytes).unwrap();
        prop_assert!(!verify_signature(
            &key,
            "r1",
            "2026-02-20T10:00:00Z",
            "web.fetch",
            &payload,
            &tampered
        )
        .unwrap());
    }
}
