// crates/warden-store-sqlite/src/connection.rs
// ============================================================================
// Module: SQLite Connection Setup
// Description: Shared connection opening and pragma configuration.
// Purpose: Give every store the same durability and concurrency settings.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! All store files open through one helper so journal mode, synchronous
//! level, and busy timeout are uniform. Schema versions are tracked through
//! `user_version`; an unknown version fails closed rather than migrating
//! blindly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout for store connections, in milliseconds.
pub(crate) const DEFAULT_BUSY_TIMEOUT_MS: i64 = 5_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors shared by all Warden stores.
///
/// # Invariants
/// - Error messages avoid embedding row payloads or secret material.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is not supported.
    #[error("sqlite store version mismatch: found {found}, expected {expected}")]
    VersionMismatch {
        /// Version found in the database file.
        found: i64,
        /// Version this build writes.
        expected: i64,
    },
}

// ============================================================================
// SECTION: Open Helper
// ============================================================================

/// Opens a store database and applies the shared pragmas.
///
/// A fresh file is stamped with `schema_version`; an existing file must
/// already carry it.
pub(crate) fn open_store(
    path: &Path,
    schema_version: i64,
    schema_sql: &str,
) -> Result<Connection, SqliteStoreError> {
    let connection = Connection::open(path).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
    connection
        .pragma_update(None, "journal_mode", "wal")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .pragma_update(None, "synchronous", "full")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .pragma_update(None, "busy_timeout", DEFAULT_BUSY_TIMEOUT_MS)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;

    let found: i64 = connection
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    if found == 0 {
        connection
            .execute_batch(schema_sql)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .pragma_update(None, "user_version", schema_version)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    } else if found != schema_version {
        return Err(SqliteStoreError::VersionMismatch {
            found,
            expected: schema_version,
        });
    }
    Ok(connection)
}
