// crates/warden-gateway/src/gateway.rs
// ============================================================================
// Module: Gateway Runtime
// Description: Lifecycle management for the gateway process.
// Purpose: Start the transport, thread the pipeline through it, stop cleanly.
// Dependencies: warden-core, warden-ipc, crate::{audit_trail, logging, pipeline, registry}, tokio
// ============================================================================

//! ## Overview
//! The runtime owns the socket server and the pipeline. Startup appends a
//! lifecycle audit entry before the first frame can arrive; shutdown stops
//! accepting, waits for in-flight work within a bounded grace period, shuts
//! adapters down, and appends the closing lifecycle entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use warden_core::AuditDirection;
use warden_core::AuditStatus;
use warden_core::sha256_hex;
use warden_ipc::IpcError;
use warden_ipc::IpcServer;
use warden_ipc::IpcServerConfig;
use warden_ipc::IpcServerHandle;
use warden_ipc::MessageHandler;
use warden_ipc::SessionHandle;

use crate::audit_trail::AuditEventParams;
use crate::audit_trail::AuditTrail;
use crate::logging::GatewayLogEvent;
use crate::logging::GatewayLogSink;
use crate::pipeline::Pipeline;
use crate::registry::ServiceRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit action name for gateway startup.
pub const ACTION_GATEWAY_STARTUP: &str = "gateway.startup";
/// Audit action name for gateway shutdown.
pub const ACTION_GATEWAY_SHUTDOWN: &str = "gateway.shutdown";
/// Request identifier recorded on lifecycle entries.
const LIFECYCLE_REQUEST_ID: &str = "gateway";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway runtime errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failed to bind or serve.
    #[error("gateway transport error: {0}")]
    Transport(String),
    /// Lifecycle audit entry could not be written.
    #[error("gateway audit error: {0}")]
    Audit(String),
    /// The gateway is not in the right state for the call.
    #[error("gateway state error: {0}")]
    State(String),
}

// ============================================================================
// SECTION: Handler Glue
// ============================================================================

/// Message handler bridging the transport to the pipeline.
struct PipelineHandler {
    /// Pipeline executing each frame.
    pipeline: Arc<Pipeline>,
    /// Operational log sink for transport events.
    log: Arc<dyn GatewayLogSink>,
}

#[async_trait]
impl MessageHandler for PipelineHandler {
    async fn handle(&self, frame: Vec<u8>, session: &SessionHandle) -> Vec<u8> {
        self.pipeline.handle_frame(frame, session).await
    }

    fn connected(&self) {
        self.log.record(&GatewayLogEvent::new("transport_connected"));
    }

    fn disconnected(&self) {
        self.log.record(&GatewayLogEvent::new("transport_disconnected"));
    }

    fn transport_error(&self, message: &str) {
        self.log
            .record(&GatewayLogEvent::new("transport_error").message(message.to_string()));
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Running state for a started gateway.
struct RunningServer {
    /// Control handle of the socket server.
    handle: IpcServerHandle,
    /// Task driving the accept loop.
    task: tokio::task::JoinHandle<Result<(), IpcError>>,
}

/// Gateway runtime: transport plus pipeline plus lifecycle accounting.
pub struct Gateway {
    /// Pipeline executing validated requests.
    pipeline: Arc<Pipeline>,
    /// Audit trail for lifecycle entries.
    audit: Arc<AuditTrail>,
    /// Adapter routing table, for shutdown.
    registry: Arc<ServiceRegistry>,
    /// Operational log sink.
    log: Arc<dyn GatewayLogSink>,
    /// Server state while started.
    running: Mutex<Option<RunningServer>>,
}

impl Gateway {
    /// Composes a gateway from its collaborators.
    #[must_use]
    pub fn new(
        pipeline: Arc<Pipeline>,
        audit: Arc<AuditTrail>,
        registry: Arc<ServiceRegistry>,
        log: Arc<dyn GatewayLogSink>,
    ) -> Self {
        Self {
            pipeline,
            audit,
            registry,
            log,
            running: Mutex::new(None),
        }
    }

    /// Binds the socket and starts serving; appends the startup entry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the socket cannot be bound, the startup
    /// entry cannot be written, or the gateway is already started.
    pub fn start(&self, ipc_config: IpcServerConfig) -> Result<(), GatewayError> {
        let mut running = self
            .running
            .lock()
            .map_err(|_| GatewayError::State("gateway lock poisoned".to_string()))?;
        if running.is_some() {
            return Err(GatewayError::State("gateway already started".to_string()));
        }

        self.append_lifecycle(ACTION_GATEWAY_STARTUP)?;
        let server =
            IpcServer::bind(ipc_config).map_err(|err| GatewayError::Transport(err.to_string()))?;
        let handle = server.handle();
        let handler = Arc::new(PipelineHandler {
            pipeline: Arc::clone(&self.pipeline),
            log: Arc::clone(&self.log),
        });
        let task = tokio::spawn(server.serve(handler));
        *running = Some(RunningServer { handle, task });
        self.log.record(&GatewayLogEvent::new("gateway_started"));
        Ok(())
    }

    /// Returns true while a Core connection is active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.running
            .lock()
            .ok()
            .and_then(|running| running.as_ref().map(|server| server.handle.is_connected()))
            .unwrap_or(false)
    }

    /// Stops the gateway: drains in-flight work, closes adapters, audits.
    ///
    /// In-flight requests get up to `grace` to finish; afterwards the serve
    /// task is abandoned and its requests surface as cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the gateway was not started or the
    /// shutdown entry cannot be written.
    pub async fn stop(&self, grace: Duration) -> Result<(), GatewayError> {
        let server = {
            let mut running = self
                .running
                .lock()
                .map_err(|_| GatewayError::State("gateway lock poisoned".to_string()))?;
            running
                .take()
                .ok_or_else(|| GatewayError::State("gateway not started".to_string()))?
        };

        server.handle.stop();
        match tokio::time::timeout(grace, server.task).await {
            Ok(joined) => {
                if let Ok(Err(err)) = joined {
                    self.log.record(
                        &GatewayLogEvent::new("transport_error").message(err.to_string()),
                    );
                }
            }
            Err(_) => {
                self.log.record(
                    &GatewayLogEvent::new("gateway_stop")
                        .message("grace period expired with work in flight".to_string()),
                );
            }
        }

        self.registry.shutdown_all();
        self.append_lifecycle(ACTION_GATEWAY_SHUTDOWN)?;
        self.log.record(&GatewayLogEvent::new("gateway_stopped"));
        Ok(())
    }

    /// Appends a lifecycle audit entry.
    fn append_lifecycle(&self, action: &str) -> Result<(), GatewayError> {
        self.audit
            .append(AuditEventParams {
                request_id: LIFECYCLE_REQUEST_ID.to_string(),
                action: action.to_string(),
                direction: AuditDirection::Response,
                status: AuditStatus::Success,
                payload_hash: sha256_hex(&[]),
                signature: String::new(),
                metadata: None,
                duration_ms: None,
            })
            .map_err(|err| GatewayError::Audit(err.to_string()))?;
        Ok(())
    }
}
