// crates/warden-gateway/src/pipeline.rs
// ============================================================================
// Module: Validation Pipeline
// Description: Ordered, short-circuiting request gauntlet.
// Purpose: Decide, record, and dispatch every action request exactly once.
// Dependencies: warden-core, warden-ipc, crate::{allowlist, anomaly, audit_trail, logging, ratelimit, registry, replay}
// ============================================================================

//! ## Overview
//! Stages run in a fixed order: schema, payload, replay, signature,
//! allowlist, rate limit, anomaly, pending audit, dispatch, final audit. A
//! failed stage aborts the run and records its own response-direction audit
//! entry; there is no silent failure and nothing rejected ever reaches an
//! adapter. Stage order is load-bearing: schema precedes signature so
//! malformed structures cannot crash verification, and allowlist precedes
//! rate limiting so blocked domains consume no quota.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use warden_core::ActionKind;
use warden_core::ActionRequest;
use warden_core::ActionResponse;
use warden_core::AuditDirection;
use warden_core::AuditMetadata;
use warden_core::AuditStatus;
use warden_core::CORE_IDENTITY;
use warden_core::Domain;
use warden_core::ErrorCode;
use warden_core::RequestEnvelope;
use warden_core::ResponseError;
use warden_core::ResponseStatus;
use warden_core::SigningKey;
use warden_core::Timestamp;
use warden_core::canonical_json_bytes;
use warden_core::sha256_hex;
use warden_core::verify_signature;
use warden_ipc::SessionHandle;

use crate::allowlist::Allowlist;
use crate::anomaly::AnomalyConfig;
use crate::anomaly::AnomalyDetector;
use crate::audit_trail::AuditEventParams;
use crate::audit_trail::AuditTrail;
use crate::logging::GatewayLogEvent;
use crate::logging::GatewayLogSink;
use crate::ratelimit::RateLimiter;
use crate::ratelimit::RateLimiterConfig;
use crate::registry::DispatchResult;
use crate::registry::ServiceRegistry;
use crate::replay::ReplayGuard;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder identity recorded for frames that do not decode.
const UNKNOWN: &str = "unknown";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Replay window in milliseconds.
    pub replay_window_ms: u64,
    /// Rate limiter configuration.
    pub rate: RateLimiterConfig,
    /// Anomaly detector configuration.
    pub anomaly: AnomalyConfig,
    /// Domains pre-seeded as known to the anomaly detector.
    pub preseeded_domains: Vec<Domain>,
    /// Default dispatch deadline in milliseconds.
    pub default_dispatch_timeout_ms: u64,
    /// Per-action dispatch deadline overrides in milliseconds.
    pub action_timeouts_ms: BTreeMap<ActionKind, u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            replay_window_ms: 300_000,
            rate: RateLimiterConfig::default(),
            anomaly: AnomalyConfig::default(),
            preseeded_domains: Vec::new(),
            default_dispatch_timeout_ms: 30_000,
            action_timeouts_ms: BTreeMap::new(),
        }
    }
}

/// Collaborators the pipeline is composed from.
pub struct PipelineParts {
    /// Shared signing key, read-only after startup.
    pub signing_key: SigningKey,
    /// Audit trail recording every outcome.
    pub audit: Arc<AuditTrail>,
    /// Domain authorization component.
    pub allowlist: Arc<Allowlist>,
    /// Adapter routing table.
    pub registry: Arc<ServiceRegistry>,
    /// Operational log sink.
    pub log: Arc<dyn GatewayLogSink>,
}

// ============================================================================
// SECTION: Rejection Plumbing
// ============================================================================

/// Identity facts about the request being rejected.
struct RequestFacts<'a> {
    /// Request identifier, or a placeholder for undecodable frames.
    request_id: &'a str,
    /// Action name, or a placeholder for undecodable frames.
    action: &'a str,
    /// Canonical payload hash.
    payload_hash: String,
    /// Request signature as submitted.
    signature: &'a str,
}

/// A rejection decision ready to be recorded and answered.
struct Rejection {
    /// Canonical error code.
    code: ErrorCode,
    /// Status recorded in the audit entry.
    audit_status: AuditStatus,
    /// Status returned to Core.
    response_status: ResponseStatus,
    /// Human-readable message.
    message: String,
    /// Target domain, when one was involved.
    domain: Option<String>,
    /// Detector reason codes, for anomaly rejections.
    reasons: Vec<String>,
}

impl Rejection {
    /// Builds a plain error rejection.
    fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            audit_status: AuditStatus::Rejected,
            response_status: ResponseStatus::Error,
            message: message.into(),
            domain: None,
            reasons: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// The validation and dispatch pipeline.
pub struct Pipeline {
    /// Shared signing key.
    signing_key: SigningKey,
    /// Audit trail.
    audit: Arc<AuditTrail>,
    /// Domain authorization.
    allowlist: Arc<Allowlist>,
    /// Adapter routing table.
    registry: Arc<ServiceRegistry>,
    /// Operational log sink.
    log: Arc<dyn GatewayLogSink>,
    /// Replay guard.
    replay: ReplayGuard,
    /// Rate limiter.
    ratelimit: RateLimiter,
    /// Anomaly detector.
    anomaly: AnomalyDetector,
    /// Default dispatch deadline in milliseconds.
    default_dispatch_timeout_ms: u64,
    /// Per-action dispatch deadline overrides in milliseconds.
    action_timeouts_ms: BTreeMap<ActionKind, u64>,
}

impl Pipeline {
    /// Composes a pipeline from its collaborators and configuration.
    #[must_use]
    pub fn new(parts: PipelineParts, config: PipelineConfig) -> Self {
        Self {
            signing_key: parts.signing_key,
            audit: parts.audit,
            allowlist: parts.allowlist,
            registry: parts.registry,
            log: parts.log,
            replay: ReplayGuard::new(config.replay_window_ms),
            ratelimit: RateLimiter::new(config.rate),
            anomaly: AnomalyDetector::new(config.anomaly, config.preseeded_domains),
            default_dispatch_timeout_ms: config.default_dispatch_timeout_ms,
            action_timeouts_ms: config.action_timeouts_ms,
        }
    }

    /// Handles one raw frame and returns the encoded response frame.
    pub async fn handle_frame(&self, frame: Vec<u8>, session: &SessionHandle) -> Vec<u8> {
        let response = match RequestEnvelope::decode(&frame) {
            Ok(envelope) => self.process(&envelope, session).await,
            Err(err) => {
                let facts = RequestFacts {
                    request_id: UNKNOWN,
                    action: UNKNOWN,
                    payload_hash: sha256_hex(&frame),
                    signature: "",
                };
                self.reject(&facts, Rejection::error(ErrorCode::SchemaInvalid, err.to_string()))
            }
        };
        serde_json::to_vec(&response).unwrap_or_else(|_| {
            br#"{"requestId":"unknown","timestamp":"1970-01-01T00:00:00Z","status":"error"}"#
                .to_vec()
        })
    }

    /// Runs the ordered stage gauntlet for a decoded envelope.
    pub async fn process(
        &self,
        envelope: &RequestEnvelope,
        session: &SessionHandle,
    ) -> ActionResponse {
        let started = Instant::now();

        // Stage 1: schema.
        let head = match envelope.check_schema() {
            Ok(head) => head,
            Err(err) => {
                let facts = RequestFacts {
                    request_id: &envelope.id,
                    action: &envelope.action,
                    payload_hash: best_effort_payload_hash(envelope),
                    signature: &envelope.signature,
                };
                return self
                    .reject(&facts, Rejection::error(ErrorCode::SchemaInvalid, err.to_string()));
            }
        };

        // Stage 2: payload, canonical bytes, and target derivation.
        let (request, canonical_payload, target) = match validate_payload(head, envelope) {
            Ok(parts) => parts,
            Err(message) => {
                let facts = RequestFacts {
                    request_id: &envelope.id,
                    action: &envelope.action,
                    payload_hash: best_effort_payload_hash(envelope),
                    signature: &envelope.signature,
                };
                return self.reject(&facts, Rejection::error(ErrorCode::PayloadInvalid, message));
            }
        };
        let payload_hash = sha256_hex(&canonical_payload);
        let facts = RequestFacts {
            request_id: request.id.as_str(),
            action: request.kind.as_str(),
            payload_hash: payload_hash.clone(),
            signature: &request.signature,
        };

        // Stage 3: replay.
        if !self.replay.check_and_record(request.id.as_str()) {
            return self.reject(
                &facts,
                Rejection::error(
                    ErrorCode::ReplayDetected,
                    format!("request id reused within replay window: {}", request.id),
                ),
            );
        }

        // Stage 4: signature.
        let verified = verify_signature(
            &self.signing_key,
            request.id.as_str(),
            request.timestamp.as_str(),
            request.kind.as_str(),
            &envelope.payload,
            &request.signature,
        );
        if !matches!(verified, Ok(true)) {
            return self.reject(
                &facts,
                Rejection::error(ErrorCode::SignatureInvalid, "signature verification failed"),
            );
        }

        // Stage 5: allowlist, for payload-targeted actions only.
        if let Some(domain) = &target {
            let allowed = self.allowlist.is_allowed(domain).unwrap_or(false);
            if !allowed {
                let mut rejection = Rejection::error(
                    ErrorCode::DomainNotAllowed,
                    format!("domain not on active allowlist: {domain}"),
                );
                rejection.domain = Some(domain.as_str().to_string());
                return self.reject(&facts, rejection);
            }
        }

        // Stage 6: rate limit.
        let decision = self.ratelimit.check(request.kind, CORE_IDENTITY);
        if !decision.allowed {
            return self.reject(
                &facts,
                Rejection {
                    code: ErrorCode::RateLimited,
                    audit_status: AuditStatus::RateLimited,
                    response_status: ResponseStatus::RateLimited,
                    message: format!("rate cap reached; retry in {} ms", decision.reset_ms),
                    domain: None,
                    reasons: Vec::new(),
                },
            );
        }

        // Stage 7: anomaly.
        let assessment = self.anomaly.assess(
            request.kind,
            CORE_IDENTITY,
            canonical_payload.len(),
            target.as_ref(),
        );
        if assessment.anomalous {
            return self.reject(
                &facts,
                Rejection {
                    code: ErrorCode::AnomalyDetected,
                    audit_status: AuditStatus::RequiresApproval,
                    response_status: ResponseStatus::RequiresApproval,
                    message: format!("anomaly detected: {}", assessment.reasons.join(", ")),
                    domain: target.as_ref().map(|domain| domain.as_str().to_string()),
                    reasons: assessment.reasons,
                },
            );
        }

        // Stage 8: pending audit write.
        let pending = self.audit.append(AuditEventParams {
            request_id: request.id.as_str().to_string(),
            action: request.kind.as_str().to_string(),
            direction: AuditDirection::Request,
            status: AuditStatus::Pending,
            payload_hash: payload_hash.clone(),
            signature: request.signature.clone(),
            metadata: None,
            duration_ms: None,
        });
        if let Err(err) = pending {
            return self.audit_write_failed(&facts, &err.to_string());
        }

        // Stage 9: dispatch under the action's deadline.
        let outcome = self.dispatch(&request, session).await;

        if outcome.success
            && let Some(domain) = &target
        {
            self.anomaly.mark_domain_seen(domain);
        }

        // Stage 10: final audit write.
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status =
            if outcome.success { AuditStatus::Success } else { AuditStatus::Error };
        let metadata = outcome.error.as_ref().map(|failure| {
            AuditMetadata::rejection(failure.code.as_str())
        });
        let final_entry = self.audit.append(AuditEventParams {
            request_id: request.id.as_str().to_string(),
            action: request.kind.as_str().to_string(),
            direction: AuditDirection::Response,
            status,
            payload_hash,
            signature: request.signature.clone(),
            metadata,
            duration_ms: Some(duration_ms),
        });
        let final_entry = match final_entry {
            Ok(entry) => entry,
            Err(err) => return self.audit_write_failed(&facts, &err.to_string()),
        };

        self.log.record(
            &GatewayLogEvent::new("gateway_request")
                .request_id(request.id.as_str())
                .action(request.kind.as_str())
                .status(if outcome.success { "success" } else { "error" })
                .duration_ms(duration_ms),
        );

        let (response_status, error) = if outcome.success {
            (ResponseStatus::Success, None)
        } else {
            let failure = outcome.error.unwrap_or_else(|| crate::registry::DispatchFailure {
                code: ErrorCode::AdapterError,
                message: "adapter failed without detail".to_string(),
            });
            (
                ResponseStatus::Error,
                Some(ResponseError {
                    code: failure.code,
                    message: failure.message,
                }),
            )
        };
        ActionResponse {
            request_id: request.id.as_str().to_string(),
            timestamp: Timestamp::now(),
            status: response_status,
            data: outcome.data,
            error,
            audit_ref: Some(final_entry.id),
        }
    }

    /// Executes the adapter under the action's deadline and the session.
    async fn dispatch(&self, request: &ActionRequest, session: &SessionHandle) -> DispatchResult {
        let timeout_ms = self
            .action_timeouts_ms
            .get(&request.kind)
            .copied()
            .unwrap_or(self.default_dispatch_timeout_ms);
        let registry = Arc::clone(&self.registry);
        let kind = request.kind;
        let payload = request.payload.clone();
        let task = tokio::task::spawn_blocking(move || registry.dispatch(kind, &payload));
        tokio::select! {
            joined = task => joined.unwrap_or_else(|err| {
                DispatchResult::fail(
                    ErrorCode::AdapterError,
                    format!("adapter task failed: {err}"),
                )
            }),
            () = tokio::time::sleep(Duration::from_millis(timeout_ms)) => DispatchResult::fail(
                ErrorCode::Timeout,
                format!("dispatch deadline of {timeout_ms} ms expired"),
            ),
            () = session.closed() => DispatchResult::fail(
                ErrorCode::Cancelled,
                "connection closed during dispatch",
            ),
        }
    }

    /// Records a rejection and builds the response for it.
    fn reject(&self, facts: &RequestFacts<'_>, rejection: Rejection) -> ActionResponse {
        let mut metadata = AuditMetadata::rejection(rejection.code.as_str());
        metadata.domain = rejection.domain;
        metadata.reasons = rejection.reasons;
        let appended = self.audit.append(AuditEventParams {
            request_id: facts.request_id.to_string(),
            action: facts.action.to_string(),
            direction: AuditDirection::Response,
            status: rejection.audit_status,
            payload_hash: facts.payload_hash.clone(),
            signature: facts.signature.to_string(),
            metadata: Some(metadata),
            duration_ms: None,
        });
        let audit_ref = match appended {
            Ok(entry) => Some(entry.id),
            Err(err) => return self.audit_write_failed(facts, &err.to_string()),
        };

        self.log.record(
            &GatewayLogEvent::new("gateway_request")
                .request_id(facts.request_id)
                .action(facts.action)
                .status(match rejection.audit_status {
                    AuditStatus::RateLimited => "rate_limited",
                    AuditStatus::RequiresApproval => "requires_approval",
                    _ => "rejected",
                })
                .error_code(rejection.code.as_str()),
        );

        ActionResponse {
            request_id: facts.request_id.to_string(),
            timestamp: Timestamp::now(),
            status: rejection.response_status,
            data: None,
            error: Some(ResponseError {
                code: rejection.code,
                message: rejection.message,
            }),
            audit_ref,
        }
    }

    /// Builds the terminal response for a failed audit append.
    fn audit_write_failed(&self, facts: &RequestFacts<'_>, detail: &str) -> ActionResponse {
        self.log.record(
            &GatewayLogEvent::new("gateway_request")
                .request_id(facts.request_id)
                .action(facts.action)
                .status("error")
                .error_code(ErrorCode::AuditWriteFailed.as_str())
                .message(detail.to_string()),
        );
        ActionResponse {
            request_id: facts.request_id.to_string(),
            timestamp: Timestamp::now(),
            status: ResponseStatus::Error,
            data: None,
            error: Some(ResponseError {
                code: ErrorCode::AuditWriteFailed,
                message: format!("audit append failed: {detail}"),
            }),
            audit_ref: None,
        }
    }
}

/// Runs the payload stage: strict record parse, canonical bytes, target.
fn validate_payload(
    head: warden_core::EnvelopeHead,
    envelope: &RequestEnvelope,
) -> Result<(ActionRequest, Vec<u8>, Option<Domain>), String> {
    let request = ActionRequest::assemble(head, envelope).map_err(|err| err.to_string())?;
    let canonical = canonical_json_bytes(&envelope.payload).map_err(|err| err.to_string())?;
    let target = request.payload.target_domain().map_err(|err| err.to_string())?;
    Ok((request, canonical, target))
}

/// Hashes the canonical payload, falling back to raw serialization.
fn best_effort_payload_hash(envelope: &RequestEnvelope) -> String {
    canonical_json_bytes(&envelope.payload).map_or_else(
        |_| sha256_hex(envelope.payload.to_string().as_bytes()),
        |bytes| sha256_hex(&bytes),
    )
}
