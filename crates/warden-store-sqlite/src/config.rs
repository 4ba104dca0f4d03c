// crates/warden-store-sqlite/src/config.rs
// ============================================================================
// Module: SQLite Configuration Store
// Description: Allowlist, credential, and metadata persistence.
// Purpose: Keep gateway configuration state durable with secrets sealed at rest.
// Dependencies: warden-core, rusqlite, aes-gcm, rand
// ============================================================================

//! ## Overview
//! One database file carries the allowlist, the credential vault, and small
//! gateway metadata. Credential secrets are sealed with AES-256-GCM under a
//! locally generated key before they reach a row; raw rows never contain
//! plaintext. Decryption only happens inside this process on read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;

use aes_gcm::Aes256Gcm;
use aes_gcm::Key;
use aes_gcm::Nonce;
use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;
use rand::RngCore;
use rand::rngs::OsRng;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use warden_core::AllowedService;
use warden_core::AllowlistStore;
use warden_core::AllowlistStoreError;
use warden_core::CredentialKind;
use warden_core::CredentialRecord;
use warden_core::CredentialStore;
use warden_core::CredentialStoreError;
use warden_core::Domain;
use warden_core::Timestamp;

use crate::connection::SqliteStoreError;
use crate::connection::open_store;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version for the configuration database.
const SCHEMA_VERSION: i64 = 1;

/// Length of the credential sealing key in bytes.
pub const CREDENTIAL_KEY_BYTES: usize = 32;

/// Length of an AES-GCM nonce in bytes.
const NONCE_BYTES: usize = 12;

/// Schema applied to fresh configuration databases.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS allowlist (
    id TEXT PRIMARY KEY,
    service_name TEXT NOT NULL,
    domain TEXT NOT NULL,
    protocol TEXT NOT NULL,
    added_by TEXT NOT NULL,
    added_at TEXT NOT NULL,
    is_active INTEGER NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_allowlist_active_domain
    ON allowlist (domain) WHERE is_active = 1;
CREATE TABLE IF NOT EXISTS credentials (
    id TEXT PRIMARY KEY,
    service TEXT NOT NULL,
    kind TEXT NOT NULL,
    username TEXT,
    nonce BLOB NOT NULL,
    ciphertext BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_credentials_service ON credentials (service);
CREATE TABLE IF NOT EXISTS gateway_meta (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Configuration store holding the allowlist, credentials, and metadata.
pub struct SqliteConfigStore {
    /// Shared connection; mutations serialize through this lock.
    connection: Mutex<Connection>,
    /// Credential sealing key.
    sealing_key: [u8; CREDENTIAL_KEY_BYTES],
}

impl SqliteConfigStore {
    /// Opens or creates the configuration database at `path`.
    ///
    /// `sealing_key` seals credential secrets at rest; it must be the key
    /// the store was first opened with, or existing secrets fail to open.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened or carries
    /// an unsupported schema version.
    pub fn open(
        path: &Path,
        sealing_key: [u8; CREDENTIAL_KEY_BYTES],
    ) -> Result<Self, SqliteStoreError> {
        let connection = open_store(path, SCHEMA_VERSION, SCHEMA_SQL)?;
        Ok(Self {
            connection: Mutex::new(connection),
            sealing_key,
        })
    }

    /// Stores a metadata value under a name, replacing any prior value.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn set_meta(&self, name: &str, value: &str) -> Result<(), SqliteStoreError> {
        let connection = self.lock_store()?;
        connection
            .execute(
                "INSERT INTO gateway_meta (name, value) VALUES (?1, ?2) ON CONFLICT(name) DO \
                 UPDATE SET value = excluded.value",
                params![name, value],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Reads a metadata value by name.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the read fails.
    pub fn get_meta(&self, name: &str) -> Result<Option<String>, SqliteStoreError> {
        let connection = self.lock_store()?;
        connection
            .query_row("SELECT value FROM gateway_meta WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))
    }

    /// Locks the connection for store-level operations.
    fn lock_store(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("config store lock poisoned".to_string()))
    }

    /// Seals a secret, returning the nonce and ciphertext.
    fn seal(&self, secret: &str) -> Result<(Vec<u8>, Vec<u8>), CredentialStoreError> {
        let key = Key::<Aes256Gcm>::from_slice(&self.sealing_key);
        let cipher = Aes256Gcm::new(key);
        let mut nonce_bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, secret.as_bytes())
            .map_err(|_| CredentialStoreError::Crypto("seal failed".to_string()))?;
        Ok((nonce_bytes.to_vec(), ciphertext))
    }

    /// Opens a sealed secret.
    fn unseal(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<String, CredentialStoreError> {
        if nonce.len() != NONCE_BYTES {
            return Err(CredentialStoreError::Crypto("bad nonce length".to_string()));
        }
        let key = Key::<Aes256Gcm>::from_slice(&self.sealing_key);
        let cipher = Aes256Gcm::new(key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialStoreError::Crypto("unseal failed".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|_| CredentialStoreError::Crypto("secret not utf-8".to_string()))
    }
}

// ============================================================================
// SECTION: Allowlist Rows
// ============================================================================

/// Builds an [`AllowedService`] from allowlist row values.
fn service_from_row(row: &rusqlite::Row<'_>) -> Result<AllowedService, AllowlistStoreError> {
    let domain_text: String =
        row.get(2).map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
    let domain = Domain::new(domain_text)
        .map_err(|err| AllowlistStoreError::Invalid(err.to_string()))?;
    let added_by_text: String =
        row.get(4).map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
    let added_by = serde_json::from_value(serde_json::Value::String(added_by_text))
        .map_err(|err| AllowlistStoreError::Invalid(format!("bad added_by: {err}")))?;
    let added_at_text: String =
        row.get(5).map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
    let added_at = Timestamp::parse(&added_at_text)
        .map_err(|err| AllowlistStoreError::Invalid(format!("bad added_at: {err}")))?;
    let is_active: i64 = row.get(6).map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
    Ok(AllowedService {
        id: row.get(0).map_err(|err| AllowlistStoreError::Io(err.to_string()))?,
        service_name: row.get(1).map_err(|err| AllowlistStoreError::Io(err.to_string()))?,
        domain,
        protocol: row.get(3).map_err(|err| AllowlistStoreError::Io(err.to_string()))?,
        added_by,
        added_at,
        is_active: is_active != 0,
    })
}

impl AllowlistStore for SqliteConfigStore {
    fn insert(&self, service: &AllowedService) -> Result<(), AllowlistStoreError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| AllowlistStoreError::Io("config store lock poisoned".to_string()))?;
        let result = connection.execute(
            "INSERT INTO allowlist (id, service_name, domain, protocol, added_by, added_at, \
             is_active) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                service.id,
                service.service_name,
                service.domain.as_str(),
                service.protocol,
                service.added_by.as_str(),
                service.added_at.as_str(),
                i64::from(service.is_active),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(AllowlistStoreError::Duplicate(service.domain.as_str().to_string()))
            }
            Err(err) => Err(AllowlistStoreError::Io(err.to_string())),
        }
    }

    fn list(&self) -> Result<Vec<AllowedService>, AllowlistStoreError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| AllowlistStoreError::Io("config store lock poisoned".to_string()))?;
        let mut statement = connection
            .prepare(
                "SELECT id, service_name, domain, protocol, added_by, added_at, is_active FROM \
                 allowlist ORDER BY added_at ASC, id ASC",
            )
            .map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
        let mut rows =
            statement.query([]).map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
        let mut services = Vec::new();
        while let Some(row) =
            rows.next().map_err(|err| AllowlistStoreError::Io(err.to_string()))?
        {
            services.push(service_from_row(row)?);
        }
        Ok(services)
    }

    fn find_active(&self, domain: &Domain) -> Result<Option<AllowedService>, AllowlistStoreError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| AllowlistStoreError::Io("config store lock poisoned".to_string()))?;
        let mut statement = connection
            .prepare(
                "SELECT id, service_name, domain, protocol, added_by, added_at, is_active FROM \
                 allowlist WHERE domain = ?1 AND is_active = 1",
            )
            .map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
        let mut rows = statement
            .query(params![domain.as_str()])
            .map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
        match rows.next().map_err(|err| AllowlistStoreError::Io(err.to_string()))? {
            Some(row) => Ok(Some(service_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn set_active(&self, id: &str, active: bool) -> Result<bool, AllowlistStoreError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| AllowlistStoreError::Io("config store lock poisoned".to_string()))?;
        let changed = connection
            .execute(
                "UPDATE allowlist SET is_active = ?1 WHERE id = ?2",
                params![i64::from(active), id],
            )
            .map_err(|err| AllowlistStoreError::Io(err.to_string()))?;
        Ok(changed > 0)
    }
}

// ============================================================================
// SECTION: Credential Rows
// ============================================================================

impl SqliteConfigStore {
    /// Builds a [`CredentialRecord`] from a credential row, opening the seal.
    fn credential_from_row(
        &self,
        row: &rusqlite::Row<'_>,
    ) -> Result<CredentialRecord, CredentialStoreError> {
        let kind_text: String =
            row.get(2).map_err(|err| CredentialStoreError::Io(err.to_string()))?;
        let kind = serde_json::from_value(serde_json::Value::String(kind_text))
            .map_err(|err| CredentialStoreError::Io(format!("bad kind: {err}")))?;
        let nonce: Vec<u8> =
            row.get(4).map_err(|err| CredentialStoreError::Io(err.to_string()))?;
        let ciphertext: Vec<u8> =
            row.get(5).map_err(|err| CredentialStoreError::Io(err.to_string()))?;
        let secret = self.unseal(&nonce, &ciphertext)?;
        Ok(CredentialRecord {
            id: row.get(0).map_err(|err| CredentialStoreError::Io(err.to_string()))?,
            service: row.get(1).map_err(|err| CredentialStoreError::Io(err.to_string()))?,
            kind,
            username: row.get(3).map_err(|err| CredentialStoreError::Io(err.to_string()))?,
            secret,
        })
    }

    /// Runs a credential query and collects the unsealed records.
    fn collect_credentials(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::types::ToSql],
    ) -> Result<Vec<CredentialRecord>, CredentialStoreError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| CredentialStoreError::Io("config store lock poisoned".to_string()))?;
        let mut statement =
            connection.prepare(sql).map_err(|err| CredentialStoreError::Io(err.to_string()))?;
        let mut rows =
            statement.query(params).map_err(|err| CredentialStoreError::Io(err.to_string()))?;
        let mut records = Vec::new();
        while let Some(row) =
            rows.next().map_err(|err| CredentialStoreError::Io(err.to_string()))?
        {
            records.push(self.credential_from_row(row)?);
        }
        Ok(records)
    }
}

impl CredentialStore for SqliteConfigStore {
    fn add(&self, record: &CredentialRecord) -> Result<(), CredentialStoreError> {
        let (nonce, ciphertext) = self.seal(&record.secret)?;
        let connection = self
            .connection
            .lock()
            .map_err(|_| CredentialStoreError::Io("config store lock poisoned".to_string()))?;
        let result = connection.execute(
            "INSERT INTO credentials (id, service, kind, username, nonce, ciphertext) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.service,
                record.kind.as_str(),
                record.username,
                nonce,
                ciphertext,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(CredentialStoreError::Duplicate(record.id.clone()))
            }
            Err(err) => Err(CredentialStoreError::Io(err.to_string())),
        }
    }

    fn get(&self, id: &str) -> Result<Option<CredentialRecord>, CredentialStoreError> {
        let records = self.collect_credentials(
            "SELECT id, service, kind, username, nonce, ciphertext FROM credentials WHERE id = ?1",
            &[&id.to_string()],
        )?;
        Ok(records.into_iter().next())
    }

    fn update(&self, record: &CredentialRecord) -> Result<bool, CredentialStoreError> {
        let (nonce, ciphertext) = self.seal(&record.secret)?;
        let connection = self
            .connection
            .lock()
            .map_err(|_| CredentialStoreError::Io("config store lock poisoned".to_string()))?;
        let changed = connection
            .execute(
                "UPDATE credentials SET service = ?1, kind = ?2, username = ?3, nonce = ?4, \
                 ciphertext = ?5 WHERE id = ?6",
                params![
                    record.service,
                    record.kind.as_str(),
                    record.username,
                    nonce,
                    ciphertext,
                    record.id,
                ],
            )
            .map_err(|err| CredentialStoreError::Io(err.to_string()))?;
        Ok(changed > 0)
    }

    fn remove(&self, id: &str) -> Result<bool, CredentialStoreError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| CredentialStoreError::Io("config store lock poisoned".to_string()))?;
        let changed = connection
            .execute("DELETE FROM credentials WHERE id = ?1", params![id])
            .map_err(|err| CredentialStoreError::Io(err.to_string()))?;
        Ok(changed > 0)
    }

    fn get_by_kind(
        &self,
        kind: CredentialKind,
    ) -> Result<Vec<CredentialRecord>, CredentialStoreError> {
        self.collect_credentials(
            "SELECT id, service, kind, username, nonce, ciphertext FROM credentials WHERE kind = \
             ?1 ORDER BY id ASC",
            &[&kind.as_str().to_string()],
        )
    }

    fn find_for_service(
        &self,
        service: &str,
    ) -> Result<Option<CredentialRecord>, CredentialStoreError> {
        let records = self.collect_credentials(
            "SELECT id, service, kind, username, nonce, ciphertext FROM credentials WHERE \
             service = ?1 ORDER BY id ASC LIMIT 1",
            &[&service.to_string()],
        )?;
        Ok(records.into_iter().next())
    }
}
