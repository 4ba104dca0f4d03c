// crates/warden-gateway/src/allowlist.rs
// ============================================================================
// Module: Allowlist
// Description: Per-domain authorization with audited mutations.
// Purpose: Decide which external domains the gateway may contact.
// Dependencies: warden-core, crate::audit_trail, rand
// ============================================================================

//! ## Overview
//! The allowlist answers one question on the hot path: is this domain
//! currently authorized? Every mutation is itself a local-only audited
//! action, so the chain records who authorized which domain and when. Seeded
//! domains are inserted at startup as system entries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use warden_core::AddedBy;
use warden_core::AllowedService;
use warden_core::AllowlistStore;
use warden_core::AuditDirection;
use warden_core::AuditMetadata;
use warden_core::AuditStatus;
use warden_core::Domain;
use warden_core::Timestamp;
use warden_core::sha256_hex;

use crate::audit_trail::AuditEventParams;
use crate::audit_trail::AuditTrail;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit action name for allowlist additions.
pub const ACTION_ALLOWLIST_ADD: &str = "allowlist.add";
/// Audit action name for allowlist deactivations.
pub const ACTION_ALLOWLIST_DEACTIVATE: &str = "allowlist.deactivate";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Allowlist errors.
#[derive(Debug, Error)]
pub enum AllowlistError {
    /// Backing store failed.
    #[error("allowlist store error: {0}")]
    Store(String),
    /// The domain already has an active entry.
    #[error("domain already allowlisted: {0}")]
    Duplicate(String),
    /// The mutation could not be audited.
    #[error("allowlist audit failed: {0}")]
    Audit(String),
}

// ============================================================================
// SECTION: Allowlist
// ============================================================================

/// Audited per-domain authorization component.
pub struct Allowlist {
    /// Backing store.
    store: Arc<dyn AllowlistStore>,
    /// Trail recording mutations.
    audit: Arc<AuditTrail>,
}

impl Allowlist {
    /// Creates the component over a store and the audit trail.
    #[must_use]
    pub fn new(store: Arc<dyn AllowlistStore>, audit: Arc<AuditTrail>) -> Self {
        Self { store, audit }
    }

    /// Returns true when the domain has an active entry.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistError::Store`] when the store cannot be read.
    pub fn is_allowed(&self, domain: &Domain) -> Result<bool, AllowlistError> {
        Ok(self
            .store
            .find_active(domain)
            .map_err(|err| AllowlistError::Store(err.to_string()))?
            .is_some())
    }

    /// Lists all entries, active and inactive.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistError::Store`] when the store cannot be read.
    pub fn list_services(&self) -> Result<Vec<AllowedService>, AllowlistError> {
        self.store.list().map_err(|err| AllowlistError::Store(err.to_string()))
    }

    /// Authorizes a domain and audits the addition.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistError::Duplicate`] when the domain is already
    /// active, [`AllowlistError::Store`] when persistence fails, and
    /// [`AllowlistError::Audit`] when the mutation cannot be recorded.
    pub fn add_service(
        &self,
        service_name: &str,
        domain: Domain,
        protocol: &str,
        added_by: AddedBy,
    ) -> Result<AllowedService, AllowlistError> {
        let service = AllowedService {
            id: format!("svc-{}", random_token()),
            service_name: service_name.to_string(),
            domain,
            protocol: protocol.to_string(),
            added_by,
            added_at: Timestamp::now(),
            is_active: true,
        };
        match self.store.insert(&service) {
            Ok(()) => {}
            Err(warden_core::AllowlistStoreError::Duplicate(domain)) => {
                return Err(AllowlistError::Duplicate(domain));
            }
            Err(err) => return Err(AllowlistError::Store(err.to_string())),
        }
        self.audit_mutation(ACTION_ALLOWLIST_ADD, &service)?;
        Ok(service)
    }

    /// Deactivates an entry and audits the change; false for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistError::Store`] when persistence fails and
    /// [`AllowlistError::Audit`] when the mutation cannot be recorded.
    pub fn deactivate(&self, id: &str) -> Result<bool, AllowlistError> {
        let services = self.list_services()?;
        let Some(service) = services.into_iter().find(|service| service.id == id) else {
            return Ok(false);
        };
        let changed = self
            .store
            .set_active(id, false)
            .map_err(|err| AllowlistError::Store(err.to_string()))?;
        if changed {
            self.audit_mutation(ACTION_ALLOWLIST_DEACTIVATE, &service)?;
        }
        Ok(changed)
    }

    /// Seeds built-in domains as system entries, skipping existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistError`] when a seed cannot be inserted or audited.
    pub fn seed_domains(
        &self,
        seeds: impl IntoIterator<Item = (String, Domain)>,
    ) -> Result<(), AllowlistError> {
        for (service_name, domain) in seeds {
            if self.is_allowed(&domain)? {
                continue;
            }
            self.add_service(&service_name, domain, "https", AddedBy::System)?;
        }
        Ok(())
    }

    /// Writes the audit entry for a mutation.
    fn audit_mutation(&self, action: &str, service: &AllowedService) -> Result<(), AllowlistError> {
        let metadata = AuditMetadata {
            domain: Some(service.domain.as_str().to_string()),
            added_by: Some(service.added_by.as_str().to_string()),
            ..AuditMetadata::default()
        };
        self.audit
            .append(AuditEventParams {
                request_id: service.id.clone(),
                action: action.to_string(),
                direction: AuditDirection::Response,
                status: AuditStatus::Success,
                payload_hash: sha256_hex(service.domain.as_str().as_bytes()),
                signature: String::new(),
                metadata: Some(metadata),
                duration_ms: None,
            })
            .map_err(|err| AllowlistError::Audit(err.to_string()))?;
        Ok(())
    }
}

/// Returns a short random hex token for entry identifiers.
fn random_token() -> String {
    let mut bytes = [0u8; 6];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
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

    use std::sync::Arc;

    use warden_core::AddedBy;
    use warden_core::AuditQuery;
    use warden_core::Domain;
    use warden_core::InMemoryAllowlistStore;
    use warden_core::InMemoryAuditStore;

    use super::ACTION_ALLOWLIST_ADD;
    use super::Allowlist;
    use crate::audit_trail::AuditTrail;

    /// Builds an allowlist over in-memory stores.
    fn allowlist() -> (Allowlist, Arc<AuditTrail>) {
        let trail = Arc::new(AuditTrail::new(Arc::new(InMemoryAuditStore::new())).unwrap());
        let list = Allowlist::new(Arc::new(InMemoryAllowlistStore::new()), Arc::clone(&trail));
        (list, trail)
    }

    /// Tests additions authorize their domain and are audited.
    #[test]
    fn test_add_authorizes_and_audits() {
        let (allowlist, trail) = allowlist();
        let domain = Domain::new("api.example.com").unwrap();
        allowlist.add_service("Example", domain.clone(), "https", AddedBy::User).unwrap();
        assert!(allowlist.is_allowed(&domain).unwrap());

        let query = AuditQuery {
            action: Some(ACTION_ALLOWLIST_ADD.to_string()),
            ..AuditQuery::default()
        };
        let entries = trail.get_entries(&query).unwrap();
        assert_eq!(entries.len(), 1);
        let metadata = entries[0].metadata.as_ref().unwrap();
        assert_eq!(metadata.domain.as_deref(), Some("api.example.com"));
        assert_eq!(metadata.added_by.as_deref(), Some("user"));
    }

    /// Tests deactivation revokes authorization and is audited.
    #[test]
    fn test_deactivate_revokes() {
        let (allowlist, trail) = allowlist();
        let domain = Domain::new("api.example.com").unwrap();
        let service =
            allowlist.add_service("Example", domain.clone(), "https", AddedBy::User).unwrap();
        assert!(allowlist.deactivate(&service.id).unwrap());
        assert!(!allowlist.is_allowed(&domain).unwrap());
        assert!(!allowlist.deactivate("missing").unwrap());
        assert_eq!(trail.count(&AuditQuery::default()).unwrap(), 2);
    }

    /// Tests seeding inserts system entries once.
    #[test]
    fn test_seed_is_idempotent() {
        let (allowlist, _trail) = allowlist();
        let seeds = vec![
            ("Search".to_string(), Domain::new("search.example.com").unwrap()),
            ("Cloud".to_string(), Domain::new("cloud.example.com").unwrap()),
        ];
        allowlist.seed_domains(seeds.clone()).unwrap();
        allowlist.seed_domains(seeds).unwrap();
        let services = allowlist.list_services().unwrap();
        assert_eq!(services.len(), 2);
        assert!(services.iter().all(|service| service.added_by == AddedBy::System));
    }

    /// Tests duplicate active domains are rejected.
    #[test]
    fn test_duplicate_domain_rejected() {
        let (allowlist, _trail) = allowlist();
        let domain = Domain::new("api.example.com").unwrap();
        allowlist.add_service("Example", domain.clone(), "https", AddedBy::User).unwrap();
        assert!(allowlist.add_service("Example2", domain, "https", AddedBy::User).is_err());
    }
}
