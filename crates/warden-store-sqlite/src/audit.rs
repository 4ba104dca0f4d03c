// crates/warden-store-sqlite/src/audit.rs
// ============================================================================
// Module: SQLite Audit Store
// Description: Durable AuditStore with monotonic insertion order.
// Purpose: Persist the hash-chained audit log across gateway restarts.
// Dependencies: warden-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Entries are stored column-per-field under an autoincrement sequence, so
//! insertion order survives restarts and scans page in that order. The store
//! persists entries exactly as given; chain hashing belongs to the audit
//! trail. Rows that fail to parse on the way out fail the read closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::params;
use warden_core::AuditEntry;
use warden_core::AuditMetadata;
use warden_core::AuditQuery;
use warden_core::AuditStore;
use warden_core::AuditStoreError;
use warden_core::Timestamp;

use crate::connection::SqliteStoreError;
use crate::connection::open_store;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version for the audit database.
const SCHEMA_VERSION: i64 = 1;

/// Schema applied to fresh audit databases.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS audit_entries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    request_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    action TEXT NOT NULL,
    direction TEXT NOT NULL,
    status TEXT NOT NULL,
    payload_hash TEXT NOT NULL,
    signature TEXT NOT NULL,
    chain_hash TEXT NOT NULL,
    metadata TEXT,
    duration_ms INTEGER
);
CREATE INDEX IF NOT EXISTS idx_audit_request ON audit_entries (request_id);
CREATE INDEX IF NOT EXISTS idx_audit_action ON audit_entries (action);
CREATE INDEX IF NOT EXISTS idx_audit_status ON audit_entries (status);
";

/// Column list shared by every entry query.
const ENTRY_COLUMNS: &str = "id, request_id, timestamp, action, direction, status, payload_hash, \
                             signature, chain_hash, metadata, duration_ms";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable audit store backed by a single `SQLite` file.
pub struct SqliteAuditStore {
    /// Shared connection; appends serialize through this lock.
    connection: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Opens or creates the audit database at `path`.
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
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AuditStoreError> {
        self.connection
            .lock()
            .map_err(|_| AuditStoreError::Io("audit store lock poisoned".to_string()))
    }
}

/// Builds an [`AuditEntry`] from a database row.
fn entry_from_row(row: &Row<'_>) -> Result<AuditEntry, AuditStoreError> {
    let timestamp_text: String = get_column(row, 2)?;
    let timestamp = Timestamp::parse(&timestamp_text)
        .map_err(|err| AuditStoreError::Corrupt(format!("bad timestamp: {err}")))?;
    let direction_text: String = get_column(row, 4)?;
    let direction = serde_json::from_value(serde_json::Value::String(direction_text))
        .map_err(|err| AuditStoreError::Corrupt(format!("bad direction: {err}")))?;
    let status_text: String = get_column(row, 5)?;
    let status = serde_json::from_value(serde_json::Value::String(status_text))
        .map_err(|err| AuditStoreError::Corrupt(format!("bad status: {err}")))?;
    let metadata_text: Option<String> = get_column(row, 9)?;
    let metadata: Option<AuditMetadata> = metadata_text
        .map(|text| {
            serde_json::from_str(&text)
                .map_err(|err| AuditStoreError::Corrupt(format!("bad metadata: {err}")))
        })
        .transpose()?;
    let duration_ms: Option<i64> = get_column(row, 10)?;
    Ok(AuditEntry {
        id: get_column(row, 0)?,
        request_id: get_column(row, 1)?,
        timestamp,
        action: get_column(row, 3)?,
        direction,
        status,
        payload_hash: get_column(row, 6)?,
        signature: get_column(row, 7)?,
        chain_hash: get_column(row, 8)?,
        metadata,
        duration_ms: duration_ms.and_then(|value| u64::try_from(value).ok()),
    })
}

/// Reads one column, mapping engine errors to store errors.
fn get_column<T: rusqlite::types::FromSql>(
    row: &Row<'_>,
    index: usize,
) -> Result<T, AuditStoreError> {
    row.get(index).map_err(|err| AuditStoreError::Io(err.to_string()))
}

/// Runs an entry query and collects the parsed rows.
fn collect_entries(
    connection: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<AuditEntry>, AuditStoreError> {
    let mut statement =
        connection.prepare(sql).map_err(|err| AuditStoreError::Io(err.to_string()))?;
    let mut rows =
        statement.query(params).map_err(|err| AuditStoreError::Io(err.to_string()))?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next().map_err(|err| AuditStoreError::Io(err.to_string()))? {
        entries.push(entry_from_row(row)?);
    }
    Ok(entries)
}

/// Builds WHERE clause text and parameters for a query's filter fields.
fn filter_clauses(query: &AuditQuery) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    if let Some(after) = &query.after {
        clauses.push("timestamp >= ?".to_string());
        params.push(Box::new(after.as_str().to_string()));
    }
    if let Some(before) = &query.before {
        clauses.push("timestamp < ?".to_string());
        params.push(Box::new(before.as_str().to_string()));
    }
    if let Some(action) = &query.action {
        clauses.push("action = ?".to_string());
        params.push(Box::new(action.clone()));
    }
    if let Some(direction) = query.direction {
        clauses.push("direction = ?".to_string());
        params.push(Box::new(direction.as_str().to_string()));
    }
    if let Some(status) = query.status {
        clauses.push("status = ?".to_string());
        params.push(Box::new(status.as_str().to_string()));
    }
    let clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (clause, params)
}

impl AuditStore for SqliteAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditStoreError> {
        let metadata = entry
            .metadata
            .as_ref()
            .map(|metadata| {
                serde_json::to_string(metadata)
                    .map_err(|err| AuditStoreError::Serialization(err.to_string()))
            })
            .transpose()?;
        let duration_ms = entry.duration_ms.and_then(|value| i64::try_from(value).ok());
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO audit_entries (id, request_id, timestamp, action, direction, status, \
                 payload_hash, signature, chain_hash, metadata, duration_ms) VALUES (?1, ?2, ?3, \
                 ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    entry.id,
                    entry.request_id,
                    entry.timestamp.as_str(),
                    entry.action,
                    entry.direction.as_str(),
                    entry.status.as_str(),
                    entry.payload_hash,
                    entry.signature,
                    entry.chain_hash,
                    metadata,
                    duration_ms,
                ],
            )
            .map_err(|err| AuditStoreError::Io(err.to_string()))?;
        Ok(())
    }

    fn tail(&self) -> Result<Option<AuditEntry>, AuditStoreError> {
        let connection = self.lock()?;
        let entries = collect_entries(
            &connection,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM audit_entries ORDER BY seq DESC LIMIT 1"
            ),
            &[],
        )?;
        Ok(entries.into_iter().next())
    }

    fn scan(&self, offset: u64, limit: usize) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let connection = self.lock()?;
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        collect_entries(
            &connection,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM audit_entries ORDER BY seq ASC LIMIT ?1 OFFSET ?2"
            ),
            &[&limit, &offset],
        )
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let connection = self.lock()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut entries = collect_entries(
            &connection,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM audit_entries ORDER BY seq DESC LIMIT ?1"
            ),
            &[&limit],
        )?;
        entries.reverse();
        Ok(entries)
    }

    fn by_request_id(&self, request_id: &str) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let connection = self.lock()?;
        collect_entries(
            &connection,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM audit_entries WHERE request_id = ?1 ORDER BY seq ASC"
            ),
            &[&request_id.to_string()],
        )
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let (clause, boxed_params) = filter_clauses(query);
        let limit = i64::try_from(query.limit.unwrap_or(usize::MAX)).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset.unwrap_or(0)).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM audit_entries{clause} ORDER BY seq ASC LIMIT {limit} \
             OFFSET {offset}"
        );
        let params: Vec<&dyn rusqlite::types::ToSql> =
            boxed_params.iter().map(|param| &**param).collect();
        let connection = self.lock()?;
        collect_entries(&connection, &sql, &params)
    }

    fn count(&self, query: &AuditQuery) -> Result<u64, AuditStoreError> {
        let (clause, boxed_params) = filter_clauses(query);
        let sql = format!("SELECT COUNT(*) FROM audit_entries{clause}");
        let params: Vec<&dyn rusqlite::types::ToSql> =
            boxed_params.iter().map(|param| &**param).collect();
        let connection = self.lock()?;
        let count: i64 = connection
            .prepare(&sql)
            .and_then(|mut statement| statement.query_row(&params[..], |row| row.get(0)))
            .map_err(|err| AuditStoreError::Io(err.to_string()))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
