// crates/warden-core/src/memory.rs
// ============================================================================
// Module: Warden In-Memory Stores
// Description: In-memory implementations of the durable store interfaces.
// Purpose: Back tests and ephemeral gateways without touching disk.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Each in-memory store mirrors the semantics of its durable counterpart:
//! insertion order is preserved, duplicate checks apply, and reads return
//! clones. Locks are held only for the duration of a single operation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use crate::core::audit::AuditEntry;
use crate::core::identifiers::Domain;
use crate::interfaces::AllowedService;
use crate::interfaces::AllowlistStore;
use crate::interfaces::AllowlistStoreError;
use crate::interfaces::AuditQuery;
use crate::interfaces::AuditStore;
use crate::interfaces::AuditStoreError;
use crate::interfaces::CredentialKind;
use crate::interfaces::CredentialRecord;
use crate::interfaces::CredentialStore;
use crate::interfaces::CredentialStoreError;
use crate::interfaces::ReminderRecord;
use crate::interfaces::ReminderStore;
use crate::interfaces::ReminderStoreError;

// ============================================================================
// SECTION: In-Memory Audit Store
// ============================================================================

/// Append-only audit store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    /// Entries in insertion order.
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the entry vector, mapping poisoning to a store error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AuditEntry>>, AuditStoreError> {
        self.entries.lock().map_err(|_| AuditStoreError::Io("audit store lock poisoned".to_string()))
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditStoreError> {
        self.lock()?.push(entry.clone());
        Ok(())
    }

    fn tail(&self) -> Result<Option<AuditEntry>, AuditStoreError> {
        Ok(self.lock()?.last().cloned())
    }

    fn scan(&self, offset: u64, limit: usize) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let entries = self.lock()?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(entries.len());
        Ok(entries[start..].iter().take(limit).cloned().collect())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let entries = self.lock()?;
        let start = entries.len().saturating_sub(limit);
        Ok(entries[start..].to_vec())
    }

    fn by_request_id(&self, request_id: &str) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let entries = self.lock()?;
        Ok(entries.iter().filter(|entry| entry.request_id == request_id).cloned().collect())
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let entries = self.lock()?;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(entries
            .iter()
            .filter(|entry| query.matches(entry))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count(&self, query: &AuditQuery) -> Result<u64, AuditStoreError> {
        let entries = self.lock()?;
        let count = entries.iter().filter(|entry| query.matches(entry)).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }
}

// ============================================================================
// SECTION: In-Memory Allowlist Store
// ============================================================================

/// Allowlist store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAllowlistStore {
    /// Entries in insertion order.
    services: Mutex<Vec<AllowedService>>,
}

impl InMemoryAllowlistStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the service vector, mapping poisoning to a store error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AllowedService>>, AllowlistStoreError> {
        self.services
            .lock()
            .map_err(|_| AllowlistStoreError::Io("allowlist store lock poisoned".to_string()))
    }
}

impl AllowlistStore for InMemoryAllowlistStore {
    fn insert(&self, service: &AllowedService) -> Result<(), AllowlistStoreError> {
        let mut services = self.lock()?;
        if service.is_active
            && services.iter().any(|existing| {
                existing.is_active && existing.domain == service.domain
            })
        {
            return Err(AllowlistStoreError::Duplicate(service.domain.as_str().to_string()));
        }
        services.push(service.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<AllowedService>, AllowlistStoreError> {
        Ok(self.lock()?.clone())
    }

    fn find_active(&self, domain: &Domain) -> Result<Option<AllowedService>, AllowlistStoreError> {
        let services = self.lock()?;
        Ok(services.iter().find(|service| service.is_active && service.domain == *domain).cloned())
    }

    fn set_active(&self, id: &str, active: bool) -> Result<bool, AllowlistStoreError> {
        let mut services = self.lock()?;
        for service in services.iter_mut() {
            if service.id == id {
                service.is_active = active;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

// ============================================================================
// SECTION: In-Memory Credential Store
// ============================================================================

/// Credential store held in process memory.
///
/// Secrets live in memory only; this store exists for tests and never
/// persists rows, so the at-rest encryption obligation does not apply.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    /// Records in insertion order.
    records: Mutex<Vec<CredentialRecord>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the record vector, mapping poisoning to a store error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<CredentialRecord>>, CredentialStoreError>
    {
        self.records
            .lock()
            .map_err(|_| CredentialStoreError::Io("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn add(&self, record: &CredentialRecord) -> Result<(), CredentialStoreError> {
        let mut records = self.lock()?;
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(CredentialStoreError::Duplicate(record.id.clone()));
        }
        records.push(record.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<CredentialRecord>, CredentialStoreError> {
        Ok(self.lock()?.iter().find(|record| record.id == id).cloned())
    }

    fn update(&self, record: &CredentialRecord) -> Result<bool, CredentialStoreError> {
        let mut records = self.lock()?;
        for existing in records.iter_mut() {
            if existing.id == record.id {
                *existing = record.clone();
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn remove(&self, id: &str) -> Result<bool, CredentialStoreError> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() != before)
    }

    fn get_by_kind(
        &self,
        kind: CredentialKind,
    ) -> Result<Vec<CredentialRecord>, CredentialStoreError> {
        Ok(self.lock()?.iter().filter(|record| record.kind == kind).cloned().collect())
    }

    fn find_for_service(
        &self,
        service: &str,
    ) -> Result<Option<CredentialRecord>, CredentialStoreError> {
        Ok(self.lock()?.iter().find(|record| record.service == service).cloned())
    }
}

// ============================================================================
// SECTION: In-Memory Reminder Store
// ============================================================================

/// Reminder store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryReminderStore {
    /// Records in insertion order.
    records: Mutex<Vec<ReminderRecord>>,
}

impl InMemoryReminderStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the record vector, mapping poisoning to a store error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ReminderRecord>>, ReminderStoreError> {
        self.records
            .lock()
            .map_err(|_| ReminderStoreError::Io("reminder store lock poisoned".to_string()))
    }
}

impl ReminderStore for InMemoryReminderStore {
    fn create(&self, record: &ReminderRecord) -> Result<(), ReminderStoreError> {
        let mut records = self.lock()?;
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(ReminderStoreError::Duplicate(record.id.clone()));
        }
        records.push(record.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ReminderRecord>, ReminderStoreError> {
        Ok(self.lock()?.iter().find(|record| record.id == id).cloned())
    }

    fn list(&self, include_completed: bool) -> Result<Vec<ReminderRecord>, ReminderStoreError> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .filter(|record| {
                include_completed
                    || record.status == crate::interfaces::ReminderStatus::Open
            })
            .cloned()
            .collect())
    }

    fn update(&self, record: &ReminderRecord) -> Result<bool, ReminderStoreError> {
        let mut records = self.lock()?;
        for existing in records.iter_mut() {
            if existing.id == record.id {
                *existing = record.clone();
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn delete(&self, id: &str) -> Result<bool, ReminderStoreError> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() != before)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::InMemoryAllowlistStore;
    use super::InMemoryAuditStore;
    use super::InMemoryCredentialStore;
    use crate::core::audit::AuditDirection;
    use crate::core::audit::AuditEntry;
    use crate::core::audit::AuditStatus;
    use crate::core::identifiers::Domain;
    use crate::core::time::Timestamp;
    use crate::interfaces::AddedBy;
    use crate::interfaces::AllowedService;
    use crate::interfaces::AllowlistStore;
    use crate::interfaces::AuditQuery;
    use crate::interfaces::AuditStore;
    use crate::interfaces::CredentialKind;
    use crate::interfaces::CredentialRecord;
    use crate::interfaces::CredentialStore;

    /// Builds a minimal audit entry for tests.
    fn entry(id: &str, request_id: &str, status: AuditStatus) -> AuditEntry {
        AuditEntry {
            id: id.to_string(),
            request_id: request_id.to_string(),
            timestamp: Timestamp::parse("2026-02-20T10:00:00Z").unwrap(),
            action: "email.send".to_string(),
            direction: AuditDirection::Response,
            status,
            payload_hash: "ph".to_string(),
            signature: String::new(),
            chain_hash: "ch".to_string(),
            metadata: None,
            duration_ms: None,
        }
    }

    /// Tests audit store ordering and filters.
    #[test]
    fn test_audit_store_order_and_query() {
        let store = InMemoryAuditStore::new();
        store.append(&entry("a1", "r1", AuditStatus::Pending)).unwrap();
        store.append(&entry("a2", "r1", AuditStatus::Success)).unwrap();
        store.append(&entry("a3", "r2", AuditStatus::Rejected)).unwrap();

        assert_eq!(store.tail().unwrap().unwrap().id, "a3");
        assert_eq!(store.by_request_id("r1").unwrap().len(), 2);
        let rejected = AuditQuery {
            status: Some(AuditStatus::Rejected),
            ..AuditQuery::default()
        };
        assert_eq!(store.count(&rejected).unwrap(), 1);
        assert_eq!(store.scan(1, 10).unwrap().first().map(|e| e.id.clone()), Some("a2".into()));
    }

    /// Tests allowlist duplicate-domain protection.
    #[test]
    fn test_allowlist_duplicate_rejected() {
        let store = InMemoryAllowlistStore::new();
        let service = AllowedService {
            id: "s1".to_string(),
            service_name: "Example".to_string(),
            domain: Domain::new("api.example.com").unwrap(),
            protocol: "https".to_string(),
            added_by: AddedBy::User,
            added_at: Timestamp::parse("2026-02-20T10:00:00Z").unwrap(),
            is_active: true,
        };
        store.insert(&service).unwrap();
        let mut duplicate = service.clone();
        duplicate.id = "s2".to_string();
        assert!(store.insert(&duplicate).is_err());
        assert!(store.set_active("s1", false).unwrap());
        assert!(store.find_active(&service.domain).unwrap().is_none());
    }

    /// Tests credential store operations.
    #[test]
    fn test_credential_store_operations() {
        let store = InMemoryCredentialStore::new();
        let record = CredentialRecord {
            id: "c1".to_string(),
            service: "api.example.com".to_string(),
            kind: CredentialKind::ApiKey,
            username: None,
            secret: "s3cret".to_string(),
        };
        store.add(&record).unwrap();
        assert!(store.add(&record).is_err());
        assert_eq!(store.find_for_service("api.example.com").unwrap().unwrap().id, "c1");
        assert_eq!(store.get_by_kind(CredentialKind::ApiKey).unwrap().len(), 1);
        assert!(store.remove("c1").unwrap());
        assert!(!store.remove("c1").unwrap());
    }
}
