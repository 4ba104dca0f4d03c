// crates/warden-adapters/src/stub.rs
// ============================================================================
// Module: Stub Adapter
// Description: Default binding for action families without an integration.
// Purpose: Answer honestly that no backend is configured, without touching anything.
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! The stub keeps the registry total over the action set: families whose
//! concrete integration lives outside this repository (mail servers,
//! calendar hosts, device peripherals) resolve here and fail with a
//! normalized not-configured error instead of `NO_ADAPTER`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use warden_core::ActionKind;
use warden_core::ActionPayload;
use warden_core::AdapterError;
use warden_core::ServiceAdapter;

// ============================================================================
// SECTION: Stub Adapter
// ============================================================================

/// Adapter that rejects every execution as not configured.
#[derive(Debug, Default)]
pub struct StubAdapter;

impl StubAdapter {
    /// Creates the stub.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ServiceAdapter for StubAdapter {
    fn execute(&self, kind: ActionKind, _payload: &ActionPayload) -> Result<Value, AdapterError> {
        Err(AdapterError::NotConfigured(format!(
            "no integration configured for {kind}"
        )))
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

    use serde_json::json;
    use warden_core::ActionKind;
    use warden_core::ActionPayload;
    use warden_core::AdapterError;
    use warden_core::ServiceAdapter;

    use super::StubAdapter;

    /// Tests the stub fails with a not-configured error.
    #[test]
    fn test_stub_not_configured() {
        let adapter = StubAdapter::new();
        let payload = ActionPayload::parse(ActionKind::ClipboardRead, &json!({})).unwrap();
        let result = adapter.execute(ActionKind::ClipboardRead, &payload);
        assert!(matches!(result, Err(AdapterError::NotConfigured(_))));
    }
}
