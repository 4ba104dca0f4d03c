// crates/warden-store-sqlite/tests/reminder_store.rs
// ============================================================================
// Module: SQLite Reminder Store Tests
// Description: Persistence tests for the reminder adapter's local state.
// ============================================================================
//! ## Overview
//! Validates reminder CRUD, due-date ordering, and completed filtering.

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

use warden_core::ReminderRecord;
use warden_core::ReminderStatus;
use warden_core::ReminderStore;
use warden_core::Timestamp;
use warden_store_sqlite::SqliteReminderStore;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a reminder record for tests.
fn reminder(id: &str, due: Option<&str>, status: ReminderStatus) -> ReminderRecord {
    ReminderRecord {
        id: id.to_string(),
        title: format!("task-{id}"),
        due: due.map(|text| Timestamp::parse(text).unwrap()),
        notes: None,
        status,
        created_at: Timestamp::parse("2026-02-20T09:00:00Z").unwrap(),
        updated_at: Timestamp::parse("2026-02-20T09:00:00Z").unwrap(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Tests create, get, update, and delete round-trips.
#[test]
fn test_reminder_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteReminderStore::open(&dir.path().join("reminders.db")).unwrap();
    let record = reminder("m1", Some("2026-02-21T08:00:00Z"), ReminderStatus::Open);
    store.create(&record).unwrap();
    assert!(store.create(&record).is_err());
    assert_eq!(store.get("m1").unwrap().unwrap(), record);

    let mut completed = record.clone();
    completed.status = ReminderStatus::Completed;
    assert!(store.update(&completed).unwrap());
    assert_eq!(store.get("m1").unwrap().unwrap().status, ReminderStatus::Completed);

    assert!(store.delete("m1").unwrap());
    assert!(!store.delete("m1").unwrap());
    assert!(store.get("m1").unwrap().is_none());
}

/// Tests listing orders by due instant with undated reminders last.
#[test]
fn test_list_orders_by_due() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteReminderStore::open(&dir.path().join("reminders.db")).unwrap();
    store.create(&reminder("m1", None, ReminderStatus::Open)).unwrap();
    store.create(&reminder("m2", Some("2026-02-22T08:00:00Z"), ReminderStatus::Open)).unwrap();
    store.create(&reminder("m3", Some("2026-02-21T08:00:00Z"), ReminderStatus::Open)).unwrap();

    let listed = store.list(false).unwrap();
    let ids: Vec<&str> = listed.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["m3", "m2", "m1"]);
}

/// Tests completed reminders are filtered unless requested.
#[test]
fn test_completed_filtering() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteReminderStore::open(&dir.path().join("reminders.db")).unwrap();
    store.create(&reminder("m1", None, ReminderStatus::Open)).unwrap();
    store.create(&reminder("m2", None, ReminderStatus::Completed)).unwrap();

    assert_eq!(store.list(false).unwrap().len(), 1);
    assert_eq!(store.list(true).unwrap().len(), 2);
}
