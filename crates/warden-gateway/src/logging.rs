// crates/warden-gateway/src/logging.rs
// ============================================================================
// Module: Gateway Operational Logging
// Description: Structured JSON-line events for gateway operation.
// Purpose: Emit redacted operational logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Operational logging is separate from the audit chain: events describe how
//! the gateway is running, the chain records what it did. Events carry no
//! payload bodies and no credential material. Deployments route them to
//! stderr, a file, or nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Event
// ============================================================================

/// Gateway operational event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayLogEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when the event belongs to a request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Action name when the event belongs to a request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Outcome status label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Canonical error code when the outcome is a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Free-form detail; never payload or credential material.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Dispatch duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl GatewayLogEvent {
    /// Creates an event with the current timestamp.
    #[must_use]
    pub fn new(event: &'static str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            request_id: None,
            action: None,
            status: None,
            error_code: None,
            message: None,
            duration_ms: None,
        }
    }

    /// Sets the request identifier.
    #[must_use]
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the action name.
    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sets the outcome status label.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sets the canonical error code.
    #[must_use]
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Sets the free-form detail message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the dispatch duration.
    #[must_use]
    pub const fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for gateway operational events.
pub trait GatewayLogSink: Send + Sync {
    /// Records an operational event.
    fn record(&self, event: &GatewayLogEvent);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrLogSink;

impl GatewayLogSink for StderrLogSink {
    fn record(&self, event: &GatewayLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileLogSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl GatewayLogSink for FileLogSink {
    fn record(&self, event: &GatewayLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink.
pub struct NoopLogSink;

impl GatewayLogSink for NoopLogSink {
    fn record(&self, _event: &GatewayLogEvent) {}
}
