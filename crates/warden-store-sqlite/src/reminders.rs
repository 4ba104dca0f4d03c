// crates/warden-store-sqlite/src/reminders.rs
// ============================================================================
// Module: SQLite Reminder Store
// Description: Durable local state for the reminder adapter.
// Purpose: Persist reminders across gateway restarts.
// Dependencies: warden-core, rusqlite
// ============================================================================

//! ## Overview
//! Reminders are the gateway's only adapter-owned local state. Rows mirror
//! the record fields; listing orders by due instant with undated reminders
//! last.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::params;
use warden_core::ReminderRecord;
use warden_core::ReminderStore;
use warden_core::ReminderStoreError;
use warden_core::Timestamp;

use crate::connection::SqliteStoreError;
use crate::connection::open_store;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version for the reminder database.
const SCHEMA_VERSION: i64 = 1;

/// Schema applied to fresh reminder databases.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS reminders (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    due TEXT,
    notes TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reminders_status ON reminders (status);
";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable reminder store backed by a single `SQLite` file.
pub struct SqliteReminderStore {
    /// Shared connection; mutations serialize through this lock.
    connection: Mutex<Connection>,
}

impl SqliteReminderStore {
    /// Opens or creates the reminder database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened or carries
    /// an unsupported schema version.
    pub fn open(path: &Path) -> Result<Self, SqliteStoreError> {
        let connection = open_store(path, SCHEMA_VERSION, SCHEMA_SQL)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Locks the connection, mapping poisoning to a store error.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ReminderStoreError> {
        self.connection
            .lock()
            .map_err(|_| ReminderStoreError::Io("reminder store lock poisoned".to_string()))
    }
}

/// Builds a [`ReminderRecord`] from a database row.
fn record_from_row(row: &Row<'_>) -> Result<ReminderRecord, ReminderStoreError> {
    let due_text: Option<String> =
        row.get(2).map_err(|err| ReminderStoreError::Io(err.to_string()))?;
    let due = due_text
        .map(|text| {
            Timestamp::parse(&text)
                .map_err(|err| ReminderStoreError::Invalid(format!("bad due: {err}")))
        })
        .transpose()?;
    let status_text: String =
        row.get(4).map_err(|err| ReminderStoreError::Io(err.to_string()))?;
    let status = serde_json::from_value(serde_json::Value::String(status_text))
        .map_err(|err| ReminderStoreError::Invalid(format!("bad status: {err}")))?;
    let created_text: String =
        row.get(5).map_err(|err| ReminderStoreError::Io(err.to_string()))?;
    let created_at = Timestamp::parse(&created_text)
        .map_err(|err| ReminderStoreError::Invalid(format!("bad created_at: {err}")))?;
    let updated_text: String =
        row.get(6).map_err(|err| ReminderStoreError::Io(err.to_string()))?;
    let updated_at = Timestamp::parse(&updated_text)
        .map_err(|err| ReminderStoreError::Invalid(format!("bad updated_at: {err}")))?;
    Ok(ReminderRecord {
        id: row.get(0).map_err(|err| ReminderStoreError::Io(err.to_string()))?,
        title: row.get(1).map_err(|err| ReminderStoreError::Io(err.to_string()))?,
        due,
        notes: row.get(3).map_err(|err| ReminderStoreError::Io(err.to_string()))?,
        status,
        created_at,
        updated_at,
    })
}

impl ReminderStore for SqliteReminderStore {
    fn create(&self, record: &ReminderRecord) -> Result<(), ReminderStoreError> {
        let connection = self.lock()?;
        let result = connection.execute(
            "INSERT INTO reminders (id, title, due, notes, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.title,
                record.due.as_ref().map(Timestamp::as_str),
                record.notes,
                record.status.as_str(),
                record.created_at.as_str(),
                record.updated_at.as_str(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(ReminderStoreError::Duplicate(record.id.clone()))
            }
            Err(err) => Err(ReminderStoreError::Io(err.to_string())),
        }
    }

    fn get(&self, id: &str) -> Result<Option<ReminderRecord>, ReminderStoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(
                "SELECT id, title, due, notes, status, created_at, updated_at FROM reminders \
                 WHERE id = ?1",
            )
            .map_err(|err| ReminderStoreError::Io(err.to_string()))?;
        let mut rows = statement
            .query(params![id])
            .map_err(|err| ReminderStoreError::Io(err.to_string()))?;
        match rows.next().map_err(|err| ReminderStoreError::Io(err.to_string()))? {
            Some(row) => Ok(Some(record_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn list(&self, include_completed: bool) -> Result<Vec<ReminderRecord>, ReminderStoreError> {
        let connection = self.lock()?;
        let sql = if include_completed {
            "SELECT id, title, due, notes, status, created_at, updated_at FROM reminders ORDER BY \
             due IS NULL, due ASC, id ASC"
        } else {
            "SELECT id, title, due, notes, status, created_at, updated_at FROM reminders WHERE \
             status = 'open' ORDER BY due IS NULL, due ASC, id ASC"
        };
        let mut statement =
            connection.prepare(sql).map_err(|err| ReminderStoreError::Io(err.to_string()))?;
        let mut rows =
            statement.query([]).map_err(|err| ReminderStoreError::Io(err.to_string()))?;
        let mut records = Vec::new();
        while let Some(row) =
            rows.next().map_err(|err| ReminderStoreError::Io(err.to_string()))?
        {
            records.push(record_from_row(row)?);
        }
        Ok(records)
    }

    fn update(&self, record: &ReminderRecord) -> Result<bool, ReminderStoreError> {
        let connection = self.lock()?;
        let changed = connection
            .execute(
                "UPDATE reminders SET title = ?1, due = ?2, notes = ?3, status = ?4, updated_at = \
                 ?5 WHERE id = ?6",
                params![
                    record.title,
                    record.due.as_ref().map(Timestamp::as_str),
                    record.notes,
                    record.status.as_str(),
                    record.updated_at.as_str(),
                    record.id,
                ],
            )
            .map_err(|err| ReminderStoreError::Io(err.to_string()))?;
        Ok(changed > 0)
    }

    fn delete(&self, id: &str) -> Result<bool, ReminderStoreError> {
        let connection = self.lock()?;
        let changed = connection
            .execute("DELETE FROM reminders WHERE id = ?1", params![id])
            .map_err(|err| ReminderStoreError::Io(err.to_string()))?;
        Ok(changed > 0)
    }
}
