// crates/warden-gateway/src/lib.rs
// ============================================================================
// Module: Warden Gateway Library
// Description: Validation pipeline and supporting state for the Gateway process.
// Purpose: Expose the pipeline, its guards, the audit trail, and the runtime.
// Dependencies: crate::{allowlist, anomaly, audit_trail, gateway, logging, pipeline, ratelimit, registry, replay}
// ============================================================================

//! ## Overview
//! The gateway validates every action request through an ordered,
//! short-circuiting pipeline and records every outcome in a hash-chained
//! audit trail. Shared state (allowlist, rate limiter, anomaly detector,
//! replay guard) is constructed at startup and threaded through the
//! composition root; nothing here is a global.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod allowlist;
pub mod anomaly;
pub mod audit_trail;
pub mod gateway;
pub mod logging;
pub mod pipeline;
pub mod ratelimit;
pub mod registry;
pub mod replay;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use allowlist::Allowlist;
pub use allowlist::AllowlistError;
pub use anomaly::AnomalyAssessment;
pub use anomaly::AnomalyConfig;
pub use anomaly::AnomalyDetector;
pub use audit_trail::AuditEventParams;
pub use audit_trail::AuditTrail;
pub use audit_trail::AuditTrailError;
pub use audit_trail::ChainVerification;
pub use audit_trail::ServiceAggregate;
pub use audit_trail::TimelineBucket;
pub use audit_trail::TimelineGranularity;
pub use gateway::Gateway;
pub use gateway::GatewayError;
pub use logging::FileLogSink;
pub use logging::GatewayLogEvent;
pub use logging::GatewayLogSink;
pub use logging::NoopLogSink;
pub use logging::StderrLogSink;
pub use pipeline::Pipeline;
pub use pipeline::PipelineConfig;
pub use pipeline::PipelineParts;
pub use ratelimit::RateDecision;
pub use ratelimit::RateLimiter;
pub use ratelimit::RateLimiterConfig;
pub use registry::DispatchFailure;
pub use registry::DispatchResult;
pub use registry::ServiceRegistry;
pub use replay::ReplayGuard;
