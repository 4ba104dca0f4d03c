// crates/warden-gateway/src/registry.rs
// ============================================================================
// Module: Service Registry
// Description: Action-kind to adapter routing with error normalization.
// Purpose: Keep adapter identity out of the pipeline entirely.
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! The registry is the only point where adapter identity is known. Dispatch
//! resolves the adapter bound to an action kind, executes it, and normalizes
//! every failure into the closed error taxonomy; nothing an adapter returns
//! or raises escapes unnormalized.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use warden_core::ALL_ACTION_KINDS;
use warden_core::ActionFamily;
use warden_core::ActionKind;
use warden_core::ActionPayload;
use warden_core::ErrorCode;
use warden_core::ServiceAdapter;

// ============================================================================
// SECTION: Dispatch Result
// ============================================================================

/// Normalized dispatch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    /// Canonical error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Normalized dispatch outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    /// Whether the adapter executed successfully.
    pub success: bool,
    /// Adapter result data on success.
    pub data: Option<Value>,
    /// Normalized failure on error.
    pub error: Option<DispatchFailure>,
}

impl DispatchResult {
    /// Builds a success result.
    #[must_use]
    pub const fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// Builds a failure result.
    #[must_use]
    pub fn fail(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(DispatchFailure {
                code,
                message: message.into(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Service Registry
// ============================================================================

/// Mapping from action kind to the adapter that executes it.
///
/// # Invariants
/// - At most one adapter per action kind; later registrations replace.
/// - Registered adapters are shared and must be internally thread-safe.
#[derive(Default)]
pub struct ServiceRegistry {
    /// Adapter bindings keyed by action kind.
    adapters: BTreeMap<ActionKind, Arc<dyn ServiceAdapter>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an adapter to a single action kind.
    pub fn register(&mut self, kind: ActionKind, adapter: Arc<dyn ServiceAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    /// Binds an adapter to every kind in a family.
    pub fn register_family(&mut self, family: ActionFamily, adapter: Arc<dyn ServiceAdapter>) {
        for kind in ALL_ACTION_KINDS {
            if kind.family() == family {
                self.adapters.insert(kind, Arc::clone(&adapter));
            }
        }
    }

    /// Returns true when a kind has an adapter bound.
    #[must_use]
    pub fn is_bound(&self, kind: ActionKind) -> bool {
        self.adapters.contains_key(&kind)
    }

    /// Dispatches a validated request to its adapter.
    ///
    /// Unbound kinds fail with `NO_ADAPTER`; adapter failures are normalized
    /// to `ADAPTER_ERROR`.
    #[must_use]
    pub fn dispatch(&self, kind: ActionKind, payload: &ActionPayload) -> DispatchResult {
        let Some(adapter) = self.adapters.get(&kind) else {
            return DispatchResult::fail(
                ErrorCode::NoAdapter,
                format!("no adapter registered for {kind}"),
            );
        };
        match adapter.execute(kind, payload) {
            Ok(data) => DispatchResult::ok(Some(data)),
            Err(err) => DispatchResult::fail(ErrorCode::AdapterError, err.to_string()),
        }
    }

    /// Shuts down every distinct registered adapter once.
    pub fn shutdown_all(&self) {
        // Compare data pointers only; one adapter may back many kinds.
        let mut seen: Vec<*const ()> = Vec::new();
        for adapter in self.adapters.values() {
            let pointer = Arc::as_ptr(adapter).cast::<()>();
            if seen.contains(&pointer) {
                continue;
            }
            seen.push(pointer);
            adapter.shutdown();
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
