// crates/warden-gateway/tests/gateway_runtime.rs
// ============================================================================
// Module: Gateway Runtime Tests
// Description: Socket-level lifecycle tests for the gateway.
// ============================================================================
//! ## Overview
//! Runs the full gateway over a real socket: lifecycle audit entries, mixed
//! traffic followed by chain verification across a store reopen, and
//! cancellation of work in flight when the client disconnects.

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

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use warden_core::ActionKind;
use warden_core::ActionPayload;
use warden_core::AdapterError;
use warden_core::AuditQuery;
use warden_core::AuditStatus;
use warden_core::InMemoryAllowlistStore;
use warden_core::RequestEnvelope;
use warden_core::ResponseStatus;
use warden_core::ServiceAdapter;
use warden_core::SigningKey;
use warden_gateway::Allowlist;
use warden_gateway::AuditTrail;
use warden_gateway::Gateway;
use warden_gateway::NoopLogSink;
use warden_gateway::Pipeline;
use warden_gateway::PipelineConfig;
use warden_gateway::PipelineParts;
use warden_gateway::ServiceRegistry;
use warden_ipc::IpcClient;
use warden_ipc::IpcServerConfig;
use warden_store_sqlite::SqliteAuditStore;

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Adapter that succeeds immediately.
struct OkAdapter;

impl ServiceAdapter for OkAdapter {
    fn execute(&self, _kind: ActionKind, _payload: &ActionPayload) -> Result<Value, AdapterError> {
        Ok(json!({"ok": true}))
    }
}

/// Adapter that sleeps long enough to outlive a disconnecting client.
struct SlowAdapter;

impl ServiceAdapter for SlowAdapter {
    fn execute(&self, _kind: ActionKind, _payload: &ActionPayload) -> Result<Value, AdapterError> {
        std::thread::sleep(Duration::from_millis(1_500));
        Ok(json!({"ok": true}))
    }
}

/// Builds a gateway over a sqlite audit store in `dir`.
fn build_gateway(
    dir: &tempfile::TempDir,
    key: &SigningKey,
    slow_email: bool,
) -> (Gateway, Arc<AuditTrail>, std::path::PathBuf) {
    let audit_path = dir.path().join("audit.db");
    let store = Arc::new(SqliteAuditStore::open(&audit_path).unwrap());
    let trail = Arc::new(AuditTrail::new(store).unwrap());
    let allowlist =
        Arc::new(Allowlist::new(Arc::new(InMemoryAllowlistStore::new()), Arc::clone(&trail)));
    let mut registry = ServiceRegistry::new();
    if slow_email {
        registry.register(ActionKind::EmailSend, Arc::new(SlowAdapter));
    } else {
        registry.register(ActionKind::EmailSend, Arc::new(OkAdapter));
    }
    registry.register(ActionKind::ReminderList, Arc::new(OkAdapter));
    let registry = Arc::new(registry);
    let pipeline = Arc::new(Pipeline::new(
        PipelineParts {
            signing_key: key.clone(),
            audit: Arc::clone(&trail),
            allowlist,
            registry: Arc::clone(&registry),
            log: Arc::new(NoopLogSink),
        },
        PipelineConfig::default(),
    ));
    let gateway =
        Gateway::new(pipeline, Arc::clone(&trail), registry, Arc::new(NoopLogSink));
    (gateway, trail, audit_path)
}

/// Builds a signed email envelope.
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
// SECTION: Tests
// ============================================================================

/// Tests chain integrity after mixed traffic, shutdown, and store reopen.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chain_integrity_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let key = SigningKey::from_bytes(&[5u8; 32]).unwrap();
    let socket = dir.path().join("warden.sock");
    let (gateway, _trail, audit_path) = build_gateway(&dir, &key, false);
    gateway.start(IpcServerConfig::new(&socket)).unwrap();

    let mut client = IpcClient::connect(&socket).await.unwrap();
    for index in 0..50 {
        let envelope = match index % 4 {
            // Valid mail requests.
            0 | 1 => email_envelope(&key, &format!("r{index}")),
            // Tampered signature.
            2 => {
                let mut envelope = email_envelope(&key, &format!("r{index}"));
                envelope.signature = "0".repeat(64);
                envelope
            }
            // Replay of an id the loop already used.
            _ => email_envelope(&key, "r0"),
        };
        let response = client.request(&envelope).await.unwrap();
        assert_eq!(response.request_id, envelope.id);
    }
    drop(client);

    gateway.stop(Duration::from_secs(5)).await.unwrap();

    // Reopen the store cold and verify the chain head to tail.
    let store = Arc::new(SqliteAuditStore::open(&audit_path).unwrap());
    let reopened = AuditTrail::new(store).unwrap();
    let verification = reopened.verify_chain_integrity().unwrap();
    assert!(verification.valid, "chain broken at {:?}", verification.first_break_id);

    // Lifecycle entries bracket the traffic.
    let startup = AuditQuery {
        action: Some("gateway.startup".to_string()),
        ..AuditQuery::default()
    };
    let shutdown = AuditQuery {
        action: Some("gateway.shutdown".to_string()),
        ..AuditQuery::default()
    };
    assert_eq!(reopened.count(&startup).unwrap(), 1);
    assert_eq!(reopened.count(&shutdown).unwrap(), 1);
}

/// Tests a disconnect mid-dispatch records a cancelled outcome.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disconnect_cancels_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let key = SigningKey::from_bytes(&[5u8; 32]).unwrap();
    let socket = dir.path().join("warden.sock");
    let (gateway, trail, _audit_path) = build_gateway(&dir, &key, true);
    gateway.start(IpcServerConfig::new(&socket)).unwrap();

    {
        let mut client = IpcClient::connect(&socket).await.unwrap();
        let envelope = email_envelope(&key, "r-hang");
        let frame = serde_json::to_vec(&envelope).unwrap();
        // The write lands immediately; the timeout abandons the response
        // wait while the adapter is still sleeping, then the client drops.
        let _ = tokio::time::timeout(Duration::from_millis(200), client.request_raw(&frame)).await;
    }

    // Give the pipeline time to observe the disconnect and finalize.
    let mut cancelled = false;
    for _ in 0..50 {
        let entries = trail.get_by_request_id("r-hang").unwrap();
        if entries.len() == 2 {
            assert_eq!(entries[1].status, AuditStatus::Error);
            assert_eq!(
                entries[1].metadata.as_ref().unwrap().rejection_reason.as_deref(),
                Some("CANCELLED")
            );
            cancelled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(cancelled, "cancelled response entry never appeared");

    gateway.stop(Duration::from_secs(5)).await.unwrap();
}

/// Tests responses decode as typed action responses over the socket.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_typed_response_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let key = SigningKey::from_bytes(&[5u8; 32]).unwrap();
    let socket = dir.path().join("warden.sock");
    let (gateway, _trail, _audit_path) = build_gateway(&dir, &key, false);
    gateway.start(IpcServerConfig::new(&socket)).unwrap();

    let mut client = IpcClient::connect(&socket).await.unwrap();
    let envelope = RequestEnvelope::signed(
        &key,
        "r-list",
        "2026-02-20T10:00:00Z",
        ActionKind::ReminderList,
        json!({}),
    )
    .unwrap();
    let response = client.request(&envelope).await.unwrap();
    assert_eq!(response.request_id, "r-list");
    assert_eq!(response.status, ResponseStatus::Success);
    assert!(response.audit_ref.is_some());

    drop(client);
    gateway.stop(Duration::from_secs(5)).await.unwrap();
}
