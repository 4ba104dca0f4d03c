// crates/warden-core/tests/chain_laws.rs
// ============================================================================
// Module: Chain Hash Law Tests
// Description: Tests for audit chain construction and tamper detection.
// ============================================================================
//! ## Overview
//! Validates that a chain built through the single chain-hash function
//! verifies head to tail and that any single-field mutation is detected.

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

use warden_core::AuditDirection;
use warden_core::AuditEntry;
use warden_core::AuditStatus;
use warden_core::Timestamp;
use warden_core::chain_hash;
use warden_core::entry_chain_hash;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a chained entry following `prev`.
fn chained_entry(prev: &str, index: usize, status: AuditStatus) -> AuditEntry {
    let timestamp = Timestamp::parse("2026-02-20T10:00:00Z").unwrap();
    let id = format!("a{index}");
    let payload_hash = format!("ph{index}");
    let hash = chain_hash(
        prev,
        &id,
        &timestamp,
        "email.send",
        AuditDirection::Response,
        status,
        &payload_hash,
    );
    AuditEntry {
        id,
        request_id: format!("r{index}"),
        timestamp,
        action: "email.send".to_string(),
        direction: AuditDirection::Response,
        status,
        payload_hash,
        signature: String::new(),
        chain_hash: hash,
        metadata: None,
        duration_ms: None,
    }
}

/// Verifies a chain head to tail, returning the first broken entry id.
fn first_break(entries: &[AuditEntry]) -> Option<String> {
    let mut prev = String::new();
    for entry in entries {
        if entry_chain_hash(&prev, entry) != entry.chain_hash {
            return Some(entry.id.clone());
        }
        prev = entry.chain_hash.clone();
    }
    None
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Tests a well-formed chain verifies end to end.
#[test]
fn test_well_formed_chain_verifies() {
    let mut entries = Vec::new();
    let mut prev = String::new();
    for index in 0..50 {
        let status = match index % 3 {
            0 => AuditStatus::Success,
            1 => AuditStatus::Rejected,
            _ => AuditStatus::RateLimited,
        };
        let entry = chained_entry(&prev, index, status);
        prev = entry.chain_hash.clone();
        entries.push(entry);
    }
    assert_eq!(first_break(&entries), None);
}

/// Tests mutating any entry field is detected at that entry.
#[test]
fn test_mutation_detected_at_entry() {
    let mut entries = Vec::new();
    let mut prev = String::new();
    for index in 0..10 {
        let entry = chained_entry(&prev, index, AuditStatus::Success);
        prev = entry.chain_hash.clone();
        entries.push(entry);
    }

    let mut tampered = entries.clone();
    tampered[4].status = AuditStatus::Rejected;
    assert_eq!(first_break(&tampered), Some("a4".to_string()));

    let mut tampered = entries.clone();
    tampered[7].payload_hash = "forged".to_string();
    assert_eq!(first_break(&tampered), Some("a7".to_string()));
}

/// Tests removing an interior entry breaks the successor.
#[test]
fn test_removal_detected_at_successor() {
    let mut entries = Vec::new();
    let mut prev = String::new();
    for index in 0..5 {
        let entry = chained_entry(&prev, index, AuditStatus::Success);
        prev = entry.chain_hash.clone();
        entries.push(entry);
    }
    entries.remove(2);
    assert_eq!(first_break(&entries), Some("a3".to_string()));
}
