// crates/warden-core/src/interfaces/mod.rs
// ============================================================================
// Module: Warden Interfaces
// Description: Backend-agnostic contracts for adapters and durable stores.
// Purpose: Define the surfaces the gateway consumes without naming implementations.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the gateway integrates with adapters and storage
//! without embedding backend details. Implementations must fail closed on
//! missing or invalid data: the pipeline treats every interface error as a
//! terminal outcome for the request it serves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::actions::ActionKind;
use crate::core::audit::AuditDirection;
use crate::core::audit::AuditEntry;
use crate::core::audit::AuditStatus;
use crate::core::identifiers::Domain;
use crate::core::payloads::ActionPayload;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Service Adapter
// ============================================================================

/// Adapter execution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never contain credential material.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No concrete integration is configured for the action.
    #[error("adapter not configured: {0}")]
    NotConfigured(String),
    /// Required credential is missing from the credential store.
    #[error("credential missing for service: {0}")]
    CredentialMissing(String),
    /// Adapter executed and failed.
    #[error("adapter failed: {0}")]
    Failed(String),
}

/// Capability surface implemented by every service adapter.
///
/// Adapters are registered per action kind; the pipeline never names adapter
/// types. Each adapter is responsible for its own internal concurrency.
pub trait ServiceAdapter: Send + Sync {
    /// Executes a validated action and returns its result data.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when execution fails; the dispatcher
    /// normalizes the failure, it never escapes the pipeline.
    fn execute(&self, kind: ActionKind, payload: &ActionPayload) -> Result<Value, AdapterError>;

    /// Releases adapter-held resources during gateway shutdown.
    fn shutdown(&self) {}
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// Audit store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AuditStoreError {
    /// Store I/O error.
    #[error("audit store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("audit store corruption: {0}")]
    Corrupt(String),
    /// Entry serialization failed.
    #[error("audit store serialization error: {0}")]
    Serialization(String),
}

/// Filter for audit queries; unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AuditQuery {
    /// Match entries at or after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Timestamp>,
    /// Match entries strictly before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Timestamp>,
    /// Match entries with this action name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Match entries with this direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<AuditDirection>,
    /// Match entries with this status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuditStatus>,
    /// Maximum number of entries to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Number of matching entries to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl AuditQuery {
    /// Returns true when the entry satisfies the non-paging filter fields.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(after) = &self.after
            && entry.timestamp < *after
        {
            return false;
        }
        if let Some(before) = &self.before
            && entry.timestamp >= *before
        {
            return false;
        }
        if let Some(action) = &self.action
            && entry.action != *action
        {
            return false;
        }
        if let Some(direction) = self.direction
            && entry.direction != direction
        {
            return false;
        }
        if let Some(status) = self.status
            && entry.status != status
        {
            return false;
        }
        true
    }
}

/// Durable, append-only audit storage with monotonic insertion order.
///
/// Implementations persist entries exactly as given; chain hashing is the
/// audit trail's responsibility, ordering is the store's.
pub trait AuditStore: Send + Sync {
    /// Appends a fully formed entry at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the append cannot be made durable.
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditStoreError>;

    /// Returns the entry at the tail, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the store cannot be read.
    fn tail(&self) -> Result<Option<AuditEntry>, AuditStoreError>;

    /// Returns entries in insertion order, starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the store cannot be read.
    fn scan(&self, offset: u64, limit: usize) -> Result<Vec<AuditEntry>, AuditStoreError>;

    /// Returns the most recent entries, newest last.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the store cannot be read.
    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditStoreError>;

    /// Returns all entries recorded for a request, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the store cannot be read.
    fn by_request_id(&self, request_id: &str) -> Result<Vec<AuditEntry>, AuditStoreError>;

    /// Returns entries matching the query, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the store cannot be read.
    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditStoreError>;

    /// Counts entries matching the query's filter fields.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the store cannot be read.
    fn count(&self, query: &AuditQuery) -> Result<u64, AuditStoreError>;
}

// ============================================================================
// SECTION: Allowlist Store
// ============================================================================

/// Originator of an allowlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddedBy {
    /// Added by explicit user action.
    User,
    /// Seeded by the gateway at startup.
    System,
}

impl AddedBy {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }
}

/// Authorized external service.
///
/// # Invariants
/// - `domain` is the authorization key; at most one active row per domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AllowedService {
    /// Stable entry identifier.
    pub id: String,
    /// Human-readable service name.
    pub service_name: String,
    /// Authorized domain.
    pub domain: Domain,
    /// Protocol the service is reached over.
    pub protocol: String,
    /// Originator of the entry.
    pub added_by: AddedBy,
    /// Creation instant.
    pub added_at: Timestamp,
    /// Whether the entry currently authorizes its domain.
    pub is_active: bool,
}

/// Allowlist store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AllowlistStoreError {
    /// Store I/O error.
    #[error("allowlist store io error: {0}")]
    Io(String),
    /// Stored data is invalid.
    #[error("allowlist store invalid data: {0}")]
    Invalid(String),
    /// An active entry for the domain already exists.
    #[error("allowlist duplicate domain: {0}")]
    Duplicate(String),
}

/// Durable storage for authorized domains.
pub trait AllowlistStore: Send + Sync {
    /// Inserts a new allowlist entry.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistStoreError::Duplicate`] when an active entry for
    /// the domain exists, or an I/O variant when persistence fails.
    fn insert(&self, service: &AllowedService) -> Result<(), AllowlistStoreError>;

    /// Lists all entries, active and inactive.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistStoreError`] when the store cannot be read.
    fn list(&self) -> Result<Vec<AllowedService>, AllowlistStoreError>;

    /// Returns the active entry for a domain, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistStoreError`] when the store cannot be read.
    fn find_active(&self, domain: &Domain) -> Result<Option<AllowedService>, AllowlistStoreError>;

    /// Activates or deactivates an entry; returns false for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistStoreError`] when the mutation cannot be persisted.
    fn set_active(&self, id: &str, active: bool) -> Result<bool, AllowlistStoreError>;
}

// ============================================================================
// SECTION: Credential Store
// ============================================================================

/// Kind of stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Account password.
    Password,
    /// Long-lived API key.
    ApiKey,
    /// OAuth token pair.
    OauthToken,
}

impl CredentialKind {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ApiKey => "api_key",
            Self::OauthToken => "oauth_token",
        }
    }
}

/// Credential record as seen by adapters.
///
/// The `secret` field is plaintext only in process memory; stores must
/// encrypt it at rest and raw persisted rows must contain no plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Stable record identifier.
    pub id: String,
    /// Service the credential belongs to (domain or account label).
    pub service: String,
    /// Credential kind.
    pub kind: CredentialKind,
    /// Account username, when applicable.
    pub username: Option<String>,
    /// Secret material.
    pub secret: String,
}

/// Credential store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never contain secret material.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Store I/O error.
    #[error("credential store io error: {0}")]
    Io(String),
    /// Encryption or decryption failed.
    #[error("credential store crypto error: {0}")]
    Crypto(String),
    /// A record with the identifier already exists.
    #[error("credential already exists: {0}")]
    Duplicate(String),
}

/// Encrypted-at-rest credential storage consumed by adapters.
pub trait CredentialStore: Send + Sync {
    /// Adds a new credential record.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::Duplicate`] when the identifier is
    /// taken, or an I/O or crypto variant when persistence fails.
    fn add(&self, record: &CredentialRecord) -> Result<(), CredentialStoreError>;

    /// Returns a record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the store cannot be read.
    fn get(&self, id: &str) -> Result<Option<CredentialRecord>, CredentialStoreError>;

    /// Replaces an existing record; returns false for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the mutation cannot be persisted.
    fn update(&self, record: &CredentialRecord) -> Result<bool, CredentialStoreError>;

    /// Removes a record; returns false for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the mutation cannot be persisted.
    fn remove(&self, id: &str) -> Result<bool, CredentialStoreError>;

    /// Returns all records of a kind.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the store cannot be read.
    fn get_by_kind(&self, kind: CredentialKind)
    -> Result<Vec<CredentialRecord>, CredentialStoreError>;

    /// Returns the first record registered for a service.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the store cannot be read.
    fn find_for_service(
        &self,
        service: &str,
    ) -> Result<Option<CredentialRecord>, CredentialStoreError>;
}

// ============================================================================
// SECTION: Reminder Store
// ============================================================================

/// Reminder lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Reminder is open.
    Open,
    /// Reminder was completed.
    Completed,
}

impl ReminderStatus {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
        }
    }
}

/// Locally stored reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReminderRecord {
    /// Stable reminder identifier.
    pub id: String,
    /// Reminder title.
    pub title: String,
    /// Due instant, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<Timestamp>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Lifecycle status.
    pub status: ReminderStatus,
    /// Creation instant.
    pub created_at: Timestamp,
    /// Last update instant.
    pub updated_at: Timestamp,
}

/// Reminder store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ReminderStoreError {
    /// Store I/O error.
    #[error("reminder store io error: {0}")]
    Io(String),
    /// Stored data is invalid.
    #[error("reminder store invalid data: {0}")]
    Invalid(String),
    /// A record with the identifier already exists.
    #[error("reminder already exists: {0}")]
    Duplicate(String),
}

/// Per-adapter local state for the reminder family.
pub trait ReminderStore: Send + Sync {
    /// Creates a reminder.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderStoreError::Duplicate`] when the identifier is
    /// taken, or an I/O variant when persistence fails.
    fn create(&self, record: &ReminderRecord) -> Result<(), ReminderStoreError>;

    /// Returns a reminder by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderStoreError`] when the store cannot be read.
    fn get(&self, id: &str) -> Result<Option<ReminderRecord>, ReminderStoreError>;

    /// Lists reminders, optionally including completed ones.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderStoreError`] when the store cannot be read.
    fn list(&self, include_completed: bool) -> Result<Vec<ReminderRecord>, ReminderStoreError>;

    /// Replaces an existing reminder; returns false for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderStoreError`] when the mutation cannot be persisted.
    fn update(&self, record: &ReminderRecord) -> Result<bool, ReminderStoreError>;

    /// Deletes a reminder; returns false for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderStoreError`] when the mutation cannot be persisted.
    fn delete(&self, id: &str) -> Result<bool, ReminderStoreError>;
}
