// crates/warden-gateway/tests/pipeline_scenarios.rs
// ============================================================================
// Module: Pipeline Scenario Tests
// Description: End-to-end fixtures for the validation pipeline.
// ============================================================================
//! ## Overview
//! Drives the pipeline through its contract scenarios: the happy path, a
//! tampered signature, an unauthorized domain, the rate cap boundary, a
//! replayed request, and anomaly flagging.

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

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use serde_json::Value;
use serde_json::json;
use warden_core::ActionKind;
use warden_core::ActionPayload;
use warden_core::AdapterError;
use warden_core::AddedBy;
use warden_core::AuditDirection;
use warden_core::AuditStatus;
use warden_core::Domain;
use warden_core::ErrorCode;
use warden_core::InMemoryAllowlistStore;
use warden_core::InMemoryAuditStore;
use warden_core::RequestEnvelope;
use warden_core::ResponseStatus;
use warden_core::ServiceAdapter;
use warden_core::SigningKey;
use warden_gateway::Allowlist;
use warden_gateway::AnomalyConfig;
use warden_gateway::AuditTrail;
use warden_gateway::NoopLogSink;
use warden_gateway::Pipeline;
use warden_gateway::PipelineConfig;
use warden_gateway::PipelineParts;
use warden_gateway::RateLimiterConfig;
use warden_gateway::ServiceRegistry;
use warden_ipc::SessionHandle;

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Adapter that records calls and succeeds.
#[derive(Default)]
struct RecordingAdapter {
    /// Number of executions observed.
    calls: AtomicUsize,
}

impl ServiceAdapter for RecordingAdapter {
    fn execute(&self, _kind: ActionKind, _payload: &ActionPayload) -> Result<Value, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"ok": true}))
    }
}

/// Adapter that sleeps before succeeding.
struct SlowAdapter {
    /// Sleep duration in milliseconds.
    delay_ms: u64,
}

impl ServiceAdapter for SlowAdapter {
    fn execute(&self, _kind: ActionKind, _payload: &ActionPayload) -> Result<Value, AdapterError> {
        std::thread::sleep(std::time::Duration::from_millis(self.delay_ms));
        Ok(json!({"slept": self.delay_ms}))
    }
}

/// Everything a scenario needs from the harness.
struct Harness {
    /// Pipeline under test.
    pipeline: Pipeline,
    /// Trail shared with the pipeline.
    trail: Arc<AuditTrail>,
    /// Adapter bound to email and service kinds.
    adapter: Arc<RecordingAdapter>,
    /// Shared signing key.
    key: SigningKey,
}

/// Builds a pipeline over in-memory stores.
///
/// `allowed` domains are seeded (and audited) before the scenario runs;
/// they are also pre-seeded into the anomaly detector.
fn harness(config: PipelineConfig, allowed: &[&str]) -> Harness {
    let key = SigningKey::from_bytes(&[3u8; 32]).unwrap();
    let trail = Arc::new(AuditTrail::new(Arc::new(InMemoryAuditStore::new())).unwrap());
    let allowlist =
        Arc::new(Allowlist::new(Arc::new(InMemoryAllowlistStore::new()), Arc::clone(&trail)));
    for domain in allowed {
        allowlist
            .add_service(domain, Domain::new(*domain).unwrap(), "https", AddedBy::User)
            .unwrap();
    }
    let adapter = Arc::new(RecordingAdapter::default());
    let mut registry = ServiceRegistry::new();
    registry.register(ActionKind::EmailSend, adapter.clone());
    registry.register(ActionKind::ServiceApiCall, adapter.clone());
    let mut config = config;
    config.preseeded_domains =
        allowed.iter().map(|domain| Domain::new(*domain).unwrap()).collect();
    let pipeline = Pipeline::new(
        PipelineParts {
            signing_key: key.clone(),
            audit: Arc::clone(&trail),
            allowlist,
            registry: Arc::new(registry),
            log: Arc::new(NoopLogSink),
        },
        config,
    );
    Harness {
        pipeline,
        trail,
        adapter,
        key,
    }
}

/// Builds the canonical happy-path envelope.
fn email_envelope(key: &SigningKey, id: &str) -> RequestEnvelope {
    RequestEnvelope::signed(
        key,
        id,
        "2026-02-20T10:00:00Z",
        ActionKind::EmailSend,
        json!({"to": ["a@b.com"], "subject": "Hi", "body": "Hello"}),
    )
    .unwrap()
}

// ============================================================================
// SECTION: Scenario 1 — Happy Path
// ============================================================================

/// Tests a valid request executes and leaves a verifying two-entry chain.
#[tokio::test]
async fn test_happy_path() {
    let harness = harness(PipelineConfig::default(), &[]);
    let envelope = email_envelope(&harness.key, "r1");
    let response = harness.pipeline.process(&envelope, &SessionHandle::detached()).await;

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.data.unwrap(), json!({"ok": true}));
    assert_eq!(harness.adapter.calls.load(Ordering::SeqCst), 1);

    let entries = harness.trail.get_by_request_id("r1").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].direction, AuditDirection::Request);
    assert_eq!(entries[0].status, AuditStatus::Pending);
    assert_eq!(entries[1].direction, AuditDirection::Response);
    assert_eq!(entries[1].status, AuditStatus::Success);
    assert_eq!(response.audit_ref.as_deref(), Some(entries[1].id.as_str()));
    assert!(entries[1].duration_ms.is_some());

    let verification = harness.trail.verify_chain_integrity().unwrap();
    assert!(verification.valid);
}

// ============================================================================
// SECTION: Scenario 2 — Bad Signature
// ============================================================================

/// Tests a tampered signature rejects before dispatch.
#[tokio::test]
async fn test_bad_signature() {
    let harness = harness(PipelineConfig::default(), &[]);
    let mut envelope = email_envelope(&harness.key, "r1");
    let flipped = if envelope.signature.ends_with('0') { '1' } else { '0' };
    envelope.signature.pop();
    envelope.signature.push(flipped);

    let response = harness.pipeline.process(&envelope, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(response.error.unwrap().code, ErrorCode::SignatureInvalid);
    assert_eq!(harness.adapter.calls.load(Ordering::SeqCst), 0);

    let entries = harness.trail.get_by_request_id("r1").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::Rejected);
    let metadata = entries[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.rejection_reason.as_deref(), Some("SIGNATURE_INVALID"));
}

// ============================================================================
// SECTION: Scenario 3 — Unauthorized Domain
// ============================================================================

/// Tests an unlisted domain rejects without consuming rate quota.
#[tokio::test]
async fn test_unauthorized_domain() {
    let config = PipelineConfig {
        rate: RateLimiterConfig {
            action_limits: BTreeMap::from([(ActionKind::ServiceApiCall, 1)]),
            global_limit: 100,
            window_ms: 60_000,
        },
        ..PipelineConfig::default()
    };
    let harness = harness(config, &["api.example.com"]);

    let evil = RequestEnvelope::signed(
        &harness.key,
        "r-evil",
        "2026-02-20T10:00:00Z",
        ActionKind::ServiceApiCall,
        json!({"service": "evil.example.com", "endpoint": "/v1/exfil", "method": "POST"}),
    )
    .unwrap();
    let response = harness.pipeline.process(&evil, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(response.error.unwrap().code, ErrorCode::DomainNotAllowed);
    assert_eq!(harness.adapter.calls.load(Ordering::SeqCst), 0);

    let entries = harness.trail.get_by_request_id("r-evil").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::Rejected);
    assert_eq!(
        entries[0].metadata.as_ref().unwrap().domain.as_deref(),
        Some("evil.example.com")
    );

    // The rejection consumed no quota: the per-action cap of one is intact.
    let good = RequestEnvelope::signed(
        &harness.key,
        "r-good",
        "2026-02-20T10:00:00Z",
        ActionKind::ServiceApiCall,
        json!({"service": "api.example.com", "endpoint": "/v1/items", "method": "GET"}),
    )
    .unwrap();
    let response = harness.pipeline.process(&good, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::Success);
}

// ============================================================================
// SECTION: Scenario 4 — Rate Cap
// ============================================================================

/// Tests the per-action cap: five pass, the sixth is rate-limited.
#[tokio::test]
async fn test_rate_cap() {
    let config = PipelineConfig {
        rate: RateLimiterConfig {
            action_limits: BTreeMap::from([(ActionKind::EmailSend, 5)]),
            global_limit: 1_000,
            window_ms: 60_000,
        },
        ..PipelineConfig::default()
    };
    let harness = harness(config, &[]);

    for index in 0..5 {
        let envelope = email_envelope(&harness.key, &format!("r{index}"));
        let response = harness.pipeline.process(&envelope, &SessionHandle::detached()).await;
        assert_eq!(response.status, ResponseStatus::Success, "request {index}");
    }

    let envelope = email_envelope(&harness.key, "r5");
    let response = harness.pipeline.process(&envelope, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::RateLimited);
    assert_eq!(response.error.unwrap().code, ErrorCode::RateLimited);

    let entries = harness.trail.get_by_request_id("r5").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, AuditStatus::RateLimited);
    assert_eq!(harness.adapter.calls.load(Ordering::SeqCst), 5);
}

// ============================================================================
// SECTION: Scenario 5 — Replay
// ============================================================================

/// Tests the exact same bytes submitted twice reject the second time.
#[tokio::test]
async fn test_replay_detected() {
    let harness = harness(PipelineConfig::default(), &[]);
    let envelope = email_envelope(&harness.key, "r1");

    let first = harness.pipeline.process(&envelope, &SessionHandle::detached()).await;
    assert_eq!(first.status, ResponseStatus::Success);

    let second = harness.pipeline.process(&envelope, &SessionHandle::detached()).await;
    assert_eq!(second.status, ResponseStatus::Error);
    assert_eq!(second.error.unwrap().code, ErrorCode::ReplayDetected);
    assert_eq!(harness.adapter.calls.load(Ordering::SeqCst), 1);

    let entries = harness.trail.get_by_request_id("r1").unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].status, AuditStatus::Rejected);
    assert_eq!(
        entries[2].metadata.as_ref().unwrap().rejection_reason.as_deref(),
        Some("REPLAY_DETECTED")
    );
}

// ============================================================================
// SECTION: Anomaly and Schema Edges
// ============================================================================

/// Tests the payload size boundary: at the cap passes, one byte over flags.
#[tokio::test]
async fn test_payload_size_boundary() {
    let config = PipelineConfig {
        anomaly: AnomalyConfig {
            max_payload_bytes: 200,
            burst_threshold: 0,
            burst_window_ms: 0,
        },
        ..PipelineConfig::default()
    };
    let harness = harness(config, &[]);

    // Canonical payload bytes decide the size; pad the body to land exactly
    // on the cap, then exceed it by one.
    let base = json!({"to": ["a@b.com"], "subject": "Hi", "body": ""});
    let base_len = warden_core::canonical_json_bytes(&base).unwrap().len();
    let fill = "x".repeat(200 - base_len);

    let at_cap = RequestEnvelope::signed(
        &harness.key,
        "r-at",
        "2026-02-20T10:00:00Z",
        ActionKind::EmailSend,
        json!({"to": ["a@b.com"], "subject": "Hi", "body": fill}),
    )
    .unwrap();
    let response = harness.pipeline.process(&at_cap, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::Success);

    let over = RequestEnvelope::signed(
        &harness.key,
        "r-over",
        "2026-02-20T10:00:00Z",
        ActionKind::EmailSend,
        json!({"to": ["a@b.com"], "subject": "Hi", "body": format!("{fill}x")}),
    )
    .unwrap();
    let response = harness.pipeline.process(&over, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::RequiresApproval);
    assert_eq!(response.error.unwrap().code, ErrorCode::AnomalyDetected);

    let entries = harness.trail.get_by_request_id("r-over").unwrap();
    assert_eq!(entries[0].status, AuditStatus::RequiresApproval);
    assert!(
        entries[0]
            .metadata
            .as_ref()
            .unwrap()
            .reasons
            .contains(&"payload_oversize".to_string())
    );
}

/// Tests unknown actions and unknown payload fields map to their codes.
#[tokio::test]
async fn test_schema_and_payload_codes() {
    let harness = harness(PipelineConfig::default(), &[]);

    let mut unknown_action = email_envelope(&harness.key, "r1");
    unknown_action.action = "email.exfiltrate".to_string();
    let response =
        harness.pipeline.process(&unknown_action, &SessionHandle::detached()).await;
    assert_eq!(response.error.unwrap().code, ErrorCode::SchemaInvalid);

    let mut extra_field = email_envelope(&harness.key, "r2");
    extra_field.payload["exfil"] = json!(true);
    let response = harness.pipeline.process(&extra_field, &SessionHandle::detached()).await;
    assert_eq!(response.error.unwrap().code, ErrorCode::PayloadInvalid);

    // Rejections at both stages were audited.
    assert_eq!(harness.trail.get_by_request_id("r1").unwrap().len(), 1);
    assert_eq!(harness.trail.get_by_request_id("r2").unwrap().len(), 1);
    assert_eq!(harness.adapter.calls.load(Ordering::SeqCst), 0);
}

/// Tests an empty allowlist rejects targeted actions and passes local ones.
#[tokio::test]
async fn test_empty_allowlist_split() {
    let harness = harness(PipelineConfig::default(), &[]);

    let targeted = RequestEnvelope::signed(
        &harness.key,
        "r-out",
        "2026-02-20T10:00:00Z",
        ActionKind::ServiceApiCall,
        json!({"service": "api.example.com", "endpoint": "/v1", "method": "GET"}),
    )
    .unwrap();
    let response = harness.pipeline.process(&targeted, &SessionHandle::detached()).await;
    assert_eq!(response.error.unwrap().code, ErrorCode::DomainNotAllowed);

    // A local-only action passes with the same empty allowlist.
    let local = email_envelope(&harness.key, "r-local");
    let response = harness.pipeline.process(&local, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::Success);
}

/// Tests an unbound action kind answers NO_ADAPTER after a pending entry.
#[tokio::test]
async fn test_unbound_kind_no_adapter() {
    let harness = harness(PipelineConfig::default(), &[]);
    let envelope = RequestEnvelope::signed(
        &harness.key,
        "r1",
        "2026-02-20T10:00:00Z",
        ActionKind::ClipboardRead,
        json!({}),
    )
    .unwrap();
    let response = harness.pipeline.process(&envelope, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(response.error.unwrap().code, ErrorCode::NoAdapter);

    let entries = harness.trail.get_by_request_id("r1").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, AuditStatus::Pending);
    assert_eq!(entries[1].status, AuditStatus::Error);
}

/// Tests the dispatch deadline produces TIMEOUT.
#[tokio::test]
async fn test_dispatch_timeout() {
    let key = SigningKey::from_bytes(&[3u8; 32]).unwrap();
    let trail = Arc::new(AuditTrail::new(Arc::new(InMemoryAuditStore::new())).unwrap());
    let allowlist =
        Arc::new(Allowlist::new(Arc::new(InMemoryAllowlistStore::new()), Arc::clone(&trail)));
    let mut registry = ServiceRegistry::new();
    registry.register(ActionKind::EmailSend, Arc::new(SlowAdapter { delay_ms: 2_000 }));
    let config = PipelineConfig {
        default_dispatch_timeout_ms: 50,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(
        PipelineParts {
            signing_key: key.clone(),
            audit: Arc::clone(&trail),
            allowlist,
            registry: Arc::new(registry),
            log: Arc::new(NoopLogSink),
        },
        config,
    );

    let envelope = email_envelope(&key, "r-slow");
    let response = pipeline.process(&envelope, &SessionHandle::detached()).await;
    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(response.error.unwrap().code, ErrorCode::Timeout);

    let entries = trail.get_by_request_id("r-slow").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].status, AuditStatus::Error);
    assert_eq!(
        entries[1].metadata.as_ref().unwrap().rejection_reason.as_deref(),
        Some("TIMEOUT")
    );
}
