// crates/warden-gateway/src/audit_trail.rs
// ============================================================================
// Module: Audit Trail
// Description: Hash-chained append orchestration and the audit query surface.
// Purpose: Serialize appends so the chain reflects insertion order exactly.
// Dependencies: warden-core, rand
// ============================================================================

//! ## Overview
//! The trail is the only writer to the audit store. Appends hold one lock
//! across hash computation and the store write, so the chain order and the
//! store's insertion order cannot diverge. Readers go straight to the store
//! and never block writers. Verification replays the chain head to tail with
//! the same single hash function the writer uses.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use warden_core::AuditDirection;
use warden_core::AuditEntry;
use warden_core::AuditMetadata;
use warden_core::AuditQuery;
use warden_core::AuditStatus;
use warden_core::AuditStore;
use warden_core::Timestamp;
use warden_core::chain_hash;
use warden_core::entry_chain_hash;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Page size used when replaying the chain for verification.
const VERIFY_PAGE_SIZE: usize = 512;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Audit trail errors.
///
/// # Invariants
/// - An `Append` failure is fatal to the request being recorded.
#[derive(Debug, Error)]
pub enum AuditTrailError {
    /// Appending to the store failed.
    #[error("audit append failed: {0}")]
    Append(String),
    /// Reading from the store failed.
    #[error("audit read failed: {0}")]
    Read(String),
}

// ============================================================================
// SECTION: Append Parameters
// ============================================================================

/// Inputs required to append an audit entry.
///
/// Identifier, timestamp, and chain hash are assigned by the trail.
#[derive(Debug, Clone)]
pub struct AuditEventParams {
    /// Identifier of the request the entry belongs to.
    pub request_id: String,
    /// Action name.
    pub action: String,
    /// Entry direction.
    pub direction: AuditDirection,
    /// Entry status.
    pub status: AuditStatus,
    /// SHA-256 hex of the canonical request payload.
    pub payload_hash: String,
    /// Request signature; empty for gateway-internal entries.
    pub signature: String,
    /// Structured metadata.
    pub metadata: Option<AuditMetadata>,
    /// Dispatch duration in milliseconds.
    pub duration_ms: Option<u64>,
}

// ============================================================================
// SECTION: Verification and Telemetry Types
// ============================================================================

/// Result of a full chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    /// Whether every entry chains from its predecessor.
    pub valid: bool,
    /// Identifier of the first entry that fails to chain.
    pub first_break_id: Option<String>,
}

/// Per-service aggregate over response-direction entries.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAggregate {
    /// Service family (the action name up to its first dot).
    pub service: String,
    /// Total responses recorded.
    pub total: u64,
    /// Successful responses.
    pub success: u64,
    /// Error responses.
    pub errors: u64,
    /// Rejected responses.
    pub rejected: u64,
    /// Rate-limited responses.
    pub rate_limited: u64,
    /// Responses flagged for approval.
    pub requires_approval: u64,
    /// Sum of estimated time saved, in milliseconds.
    pub estimated_time_saved_ms: u64,
}

/// Time-bucket granularity for the activity timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineGranularity {
    /// One bucket per hour.
    Hour,
    /// One bucket per day.
    Day,
}

impl TimelineGranularity {
    /// Returns the bucket length in milliseconds.
    #[must_use]
    pub const fn bucket_ms(self) -> i64 {
        match self {
            Self::Hour => 60 * 60 * 1_000,
            Self::Day => 24 * 60 * 60 * 1_000,
        }
    }
}

/// One bucket of the activity timeline.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBucket {
    /// Bucket start as unix milliseconds.
    pub bucket_start_ms: i64,
    /// Total responses in the bucket.
    pub total: u64,
    /// Successful responses in the bucket.
    pub success: u64,
    /// Non-success responses in the bucket.
    pub failed: u64,
}

// ============================================================================
// SECTION: Audit Trail
// ============================================================================

/// Single-writer front of the audit store.
pub struct AuditTrail {
    /// Backing store.
    store: Arc<dyn AuditStore>,
    /// Chain hash of the current tail; empty before the first entry.
    tail_hash: Mutex<String>,
    /// Monotonic sequence for entry identifiers.
    sequence: AtomicU64,
    /// Random per-process prefix keeping identifiers unique across restarts.
    session: String,
}

impl AuditTrail {
    /// Opens the trail over a store, resuming the chain from its tail.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Read`] when the tail cannot be loaded.
    pub fn new(store: Arc<dyn AuditStore>) -> Result<Self, AuditTrailError> {
        let tail = store.tail().map_err(|err| AuditTrailError::Read(err.to_string()))?;
        let tail_hash = tail.map(|entry| entry.chain_hash).unwrap_or_default();
        let mut session_bytes = [0u8; 4];
        OsRng.fill_bytes(&mut session_bytes);
        let session: String = session_bytes.iter().map(|byte| format!("{byte:02x}")).collect();
        Ok(Self {
            store,
            tail_hash: Mutex::new(tail_hash),
            sequence: AtomicU64::new(0),
            session,
        })
    }

    /// Appends an entry, assigning its identifier, timestamp, and chain hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Append`] when the entry cannot be made
    /// durable; the chain tail is left unchanged in that case.
    pub fn append(&self, params: AuditEventParams) -> Result<AuditEntry, AuditTrailError> {
        let mut tail = self
            .tail_hash
            .lock()
            .map_err(|_| AuditTrailError::Append("audit trail lock poisoned".to_string()))?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let id = format!("ae-{}-{sequence:08}", self.session);
        let timestamp = Timestamp::now();
        let hash = chain_hash(
            &tail,
            &id,
            &timestamp,
            &params.action,
            params.direction,
            params.status,
            &params.payload_hash,
        );
        let entry = AuditEntry {
            id,
            request_id: params.request_id,
            timestamp,
            action: params.action,
            direction: params.direction,
            status: params.status,
            payload_hash: params.payload_hash,
            signature: params.signature,
            chain_hash: hash,
            metadata: params.metadata,
            duration_ms: params.duration_ms,
        };
        self.store.append(&entry).map_err(|err| AuditTrailError::Append(err.to_string()))?;
        tail.clear();
        tail.push_str(&entry.chain_hash);
        Ok(entry)
    }

    /// Returns the most recent entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Read`] when the store cannot be read.
    pub fn get_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditTrailError> {
        self.store.recent(limit).map_err(|err| AuditTrailError::Read(err.to_string()))
    }

    /// Returns all entries recorded for a request.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Read`] when the store cannot be read.
    pub fn get_by_request_id(&self, request_id: &str) -> Result<Vec<AuditEntry>, AuditTrailError> {
        self.store
            .by_request_id(request_id)
            .map_err(|err| AuditTrailError::Read(err.to_string()))
    }

    /// Returns entries matching a query.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Read`] when the store cannot be read.
    pub fn get_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditTrailError> {
        self.store.query(query).map_err(|err| AuditTrailError::Read(err.to_string()))
    }

    /// Counts entries matching a query's filter fields.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Read`] when the store cannot be read.
    pub fn count(&self, query: &AuditQuery) -> Result<u64, AuditTrailError> {
        self.store.count(query).map_err(|err| AuditTrailError::Read(err.to_string()))
    }

    /// Recomputes the chain head to tail.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Read`] when the store cannot be read.
    pub fn verify_chain_integrity(&self) -> Result<ChainVerification, AuditTrailError> {
        let mut previous = String::new();
        let mut offset = 0u64;
        loop {
            let page = self
                .store
                .scan(offset, VERIFY_PAGE_SIZE)
                .map_err(|err| AuditTrailError::Read(err.to_string()))?;
            if page.is_empty() {
                return Ok(ChainVerification {
                    valid: true,
                    first_break_id: None,
                });
            }
            for entry in &page {
                if entry_chain_hash(&previous, entry) != entry.chain_hash {
                    return Ok(ChainVerification {
                        valid: false,
                        first_break_id: Some(entry.id.clone()),
                    });
                }
                previous.clear();
                previous.push_str(&entry.chain_hash);
            }
            offset += u64::try_from(page.len()).unwrap_or(u64::MAX);
        }
    }

    /// Aggregates response-direction entries by service family.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Read`] when the store cannot be read.
    pub fn aggregate_by_service(
        &self,
        period: &AuditQuery,
    ) -> Result<Vec<ServiceAggregate>, AuditTrailError> {
        let mut query = period.clone();
        query.direction = Some(AuditDirection::Response);
        let entries = self.get_entries(&query)?;
        let mut aggregates: std::collections::BTreeMap<String, ServiceAggregate> =
            std::collections::BTreeMap::new();
        for entry in entries {
            let service =
                entry.action.split_once('.').map_or(entry.action.as_str(), |(head, _)| head);
            let aggregate =
                aggregates.entry(service.to_string()).or_insert_with(|| ServiceAggregate {
                    service: service.to_string(),
                    total: 0,
                    success: 0,
                    errors: 0,
                    rejected: 0,
                    rate_limited: 0,
                    requires_approval: 0,
                    estimated_time_saved_ms: 0,
                });
            aggregate.total += 1;
            match entry.status {
                AuditStatus::Success => aggregate.success += 1,
                AuditStatus::Error => aggregate.errors += 1,
                AuditStatus::Rejected => aggregate.rejected += 1,
                AuditStatus::RateLimited => aggregate.rate_limited += 1,
                AuditStatus::RequiresApproval => aggregate.requires_approval += 1,
                AuditStatus::Pending => {}
            }
            if let Some(saved) =
                entry.metadata.as_ref().and_then(|metadata| metadata.estimated_time_saved_ms)
            {
                aggregate.estimated_time_saved_ms =
                    aggregate.estimated_time_saved_ms.saturating_add(saved);
            }
        }
        Ok(aggregates.into_values().collect())
    }

    /// Buckets response-direction entries over time.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Read`] when the store cannot be read.
    pub fn get_timeline(
        &self,
        period: &AuditQuery,
        granularity: TimelineGranularity,
    ) -> Result<Vec<TimelineBucket>, AuditTrailError> {
        let mut query = period.clone();
        query.direction = Some(AuditDirection::Response);
        let entries = self.get_entries(&query)?;
        let bucket_ms = granularity.bucket_ms();
        let mut buckets: std::collections::BTreeMap<i64, TimelineBucket> =
            std::collections::BTreeMap::new();
        for entry in entries {
            let millis = entry.timestamp.unix_millis();
            let start = millis.div_euclid(bucket_ms) * bucket_ms;
            let bucket = buckets.entry(start).or_insert_with(|| TimelineBucket {
                bucket_start_ms: start,
                total: 0,
                success: 0,
                failed: 0,
            });
            bucket.total += 1;
            if entry.status == AuditStatus::Success {
                bucket.success += 1;
            } else {
                bucket.failed += 1;
            }
        }
        Ok(buckets.into_values().collect())
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

    use std::sync::Arc;

    use warden_core::AuditDirection;
    use warden_core::AuditMetadata;
    use warden_core::AuditQuery;
    use warden_core::AuditStatus;
    use warden_core::InMemoryAuditStore;

    use super::AuditEventParams;
    use super::AuditTrail;
    use super::TimelineGranularity;

    /// Builds append parameters for tests.
    fn params(request_id: &str, action: &str, status: AuditStatus) -> AuditEventParams {
        AuditEventParams {
            request_id: request_id.to_string(),
            action: action.to_string(),
            direction: AuditDirection::Response,
            status,
            payload_hash: "ph".to_string(),
            signature: String::new(),
            metadata: None,
            duration_ms: None,
        }
    }

    /// Tests appended entries chain and verify.
    #[test]
    fn test_append_chains_and_verifies() {
        let trail = AuditTrail::new(Arc::new(InMemoryAuditStore::new())).unwrap();
        for index in 0..20 {
            trail
                .append(params(&format!("r{index}"), "email.send", AuditStatus::Success))
                .unwrap();
        }
        let verification = trail.verify_chain_integrity().unwrap();
        assert!(verification.valid);
        assert!(verification.first_break_id.is_none());
    }

    /// Tests entry identifiers are unique and ordered.
    #[test]
    fn test_entry_ids_unique() {
        let trail = AuditTrail::new(Arc::new(InMemoryAuditStore::new())).unwrap();
        let first = trail.append(params("r1", "email.send", AuditStatus::Success)).unwrap();
        let second = trail.append(params("r2", "email.send", AuditStatus::Success)).unwrap();
        assert_ne!(first.id, second.id);
    }

    /// Tests service aggregation over mixed outcomes.
    #[test]
    fn test_aggregate_by_service() {
        let trail = AuditTrail::new(Arc::new(InMemoryAuditStore::new())).unwrap();
        trail.append(params("r1", "email.send", AuditStatus::Success)).unwrap();
        trail.append(params("r2", "email.fetch", AuditStatus::Rejected)).unwrap();
        let mut saved = params("r3", "web.search", AuditStatus::Success);
        saved.metadata = Some(AuditMetadata {
            estimated_time_saved_ms: Some(120_000),
            ..AuditMetadata::default()
        });
        trail.append(saved).unwrap();

        let aggregates = trail.aggregate_by_service(&AuditQuery::default()).unwrap();
        assert_eq!(aggregates.len(), 2);
        let email = aggregates.iter().find(|a| a.service == "email").unwrap();
        assert_eq!(email.total, 2);
        assert_eq!(email.success, 1);
        assert_eq!(email.rejected, 1);
        let web = aggregates.iter().find(|a| a.service == "web").unwrap();
        assert_eq!(web.estimated_time_saved_ms, 120_000);
    }

    /// Tests the timeline buckets by hour.
    #[test]
    fn test_timeline_buckets() {
        let trail = AuditTrail::new(Arc::new(InMemoryAuditStore::new())).unwrap();
        trail.append(params("r1", "email.send", AuditStatus::Success)).unwrap();
        trail.append(params("r2", "email.send", AuditStatus::Error)).unwrap();
        let timeline =
            trail.get_timeline(&AuditQuery::default(), TimelineGranularity::Hour).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].total, 2);
        assert_eq!(timeline[0].success, 1);
        assert_eq!(timeline[0].failed, 1);
    }
}
