// crates/warden-adapters/src/reminders.rs
// ============================================================================
// Module: Reminder Adapter
// Description: Local reminder operations over the reminder store.
// Purpose: Execute the reminder family without ever touching the network.
// Dependencies: warden-core, rand
// ============================================================================

//! ## Overview
//! Reminders are the gateway's local-only adapter family: every operation
//! reads or mutates the injected reminder store. Due instants are validated
//! as RFC 3339 at execution so malformed dates fail the request instead of
//! poisoning the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use serde_json::json;
use warden_core::ActionKind;
use warden_core::ActionPayload;
use warden_core::AdapterError;
use warden_core::ReminderRecord;
use warden_core::ReminderStatus;
use warden_core::ReminderStore;
use warden_core::ServiceAdapter;
use warden_core::Timestamp;

// ============================================================================
// SECTION: Reminder Adapter
// ============================================================================

/// Adapter executing the reminder family against local state.
pub struct ReminderAdapter {
    /// Backing reminder store.
    store: Arc<dyn ReminderStore>,
}

impl ReminderAdapter {
    /// Creates the adapter over a store.
    #[must_use]
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }

    /// Loads a reminder or fails with a stable message.
    fn load(&self, id: &str) -> Result<ReminderRecord, AdapterError> {
        self.store
            .get(id)
            .map_err(|err| AdapterError::Failed(err.to_string()))?
            .ok_or_else(|| AdapterError::Failed(format!("reminder not found: {id}")))
    }

    /// Persists an updated reminder, stamping `updated_at`.
    fn save(&self, mut record: ReminderRecord) -> Result<ReminderRecord, AdapterError> {
        record.updated_at = Timestamp::now();
        let known =
            self.store.update(&record).map_err(|err| AdapterError::Failed(err.to_string()))?;
        if !known {
            return Err(AdapterError::Failed(format!("reminder not found: {}", record.id)));
        }
        Ok(record)
    }
}

/// Parses an optional due field, failing on malformed input.
fn parse_due(due: Option<&str>) -> Result<Option<Timestamp>, AdapterError> {
    due.map(|text| {
        Timestamp::parse(text).map_err(|err| AdapterError::Failed(format!("bad due date: {err}")))
    })
    .transpose()
}

/// Serializes a reminder for the response payload.
fn reminder_json(record: &ReminderRecord) -> Result<Value, AdapterError> {
    serde_json::to_value(record).map_err(|err| AdapterError::Failed(err.to_string()))
}

impl ServiceAdapter for ReminderAdapter {
    fn execute(&self, kind: ActionKind, payload: &ActionPayload) -> Result<Value, AdapterError> {
        match payload {
            ActionPayload::ReminderCreate(payload) => {
                let now = Timestamp::now();
                let mut token = [0u8; 6];
                OsRng.fill_bytes(&mut token);
                let id: String = token.iter().map(|byte| format!("{byte:02x}")).collect();
                let record = ReminderRecord {
                    id: format!("rem-{id}"),
                    title: payload.title.clone(),
                    due: parse_due(payload.due.as_deref())?,
                    notes: payload.notes.clone(),
                    status: ReminderStatus::Open,
                    created_at: now.clone(),
                    updated_at: now,
                };
                self.store
                    .create(&record)
                    .map_err(|err| AdapterError::Failed(err.to_string()))?;
                reminder_json(&record)
            }
            ActionPayload::ReminderList(payload) => {
                let records = self
                    .store
                    .list(payload.include_completed.unwrap_or(false))
                    .map_err(|err| AdapterError::Failed(err.to_string()))?;
                let reminders: Result<Vec<Value>, AdapterError> =
                    records.iter().map(reminder_json).collect();
                Ok(json!({"reminders": reminders?}))
            }
            ActionPayload::ReminderUpdate(payload) => {
                let mut record = self.load(&payload.reminder_id)?;
                if let Some(title) = &payload.title {
                    record.title = title.clone();
                }
                if payload.due.is_some() {
                    record.due = parse_due(payload.due.as_deref())?;
                }
                if let Some(notes) = &payload.notes {
                    record.notes = Some(notes.clone());
                }
                reminder_json(&self.save(record)?)
            }
            ActionPayload::ReminderComplete(payload) => {
                let mut record = self.load(&payload.reminder_id)?;
                record.status = ReminderStatus::Completed;
                reminder_json(&self.save(record)?)
            }
            ActionPayload::ReminderSnooze(payload) => {
                let mut record = self.load(&payload.reminder_id)?;
                record.due = parse_due(Some(&payload.until))?;
                record.status = ReminderStatus::Open;
                reminder_json(&self.save(record)?)
            }
            ActionPayload::ReminderDelete(payload) => {
                let deleted = self
                    .store
                    .delete(&payload.reminder_id)
                    .map_err(|err| AdapterError::Failed(err.to_string()))?;
                if !deleted {
                    return Err(AdapterError::Failed(format!(
                        "reminder not found: {}",
                        payload.reminder_id
                    )));
                }
                Ok(json!({"deleted": payload.reminder_id}))
            }
            _ => Err(AdapterError::Failed(format!(
                "reminder adapter cannot execute {kind}"
            ))),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
