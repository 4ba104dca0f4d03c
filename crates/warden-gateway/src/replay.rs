// crates/warden-gateway/src/replay.rs
// ============================================================================
// Module: Replay Guard
// Description: Bounded-memory duplicate detection for request identifiers.
// Purpose: Reject a request id seen again within the replay window.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The guard keeps a time-ordered queue of accepted identifiers and a set for
//! membership checks. Eviction happens on every check, so memory is bounded
//! by the arrival rate times the window, never by total history.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

// ============================================================================
// SECTION: Replay Guard
// ============================================================================

/// Time-ordered replay state behind one short critical section.
#[derive(Debug, Default)]
struct ReplayState {
    /// Accepted identifiers in arrival order, with acceptance time.
    order: VecDeque<(u64, String)>,
    /// Membership index over `order`.
    seen: HashSet<String>,
}

/// Sliding-window duplicate detector for request identifiers.
///
/// # Invariants
/// - An identifier is held for at most `window_ms` after acceptance.
/// - `order` and `seen` always describe the same identifier set.
#[derive(Debug)]
pub struct ReplayGuard {
    /// Replay window in milliseconds.
    window_ms: u64,
    /// Guarded replay state.
    state: Mutex<ReplayState>,
}

impl ReplayGuard {
    /// Creates a guard with the given window.
    #[must_use]
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            state: Mutex::new(ReplayState::default()),
        }
    }

    /// Checks and records an identifier at the current wall time.
    ///
    /// Returns true when the identifier is fresh; false when it was already
    /// accepted within the window.
    #[must_use]
    pub fn check_and_record(&self, id: &str) -> bool {
        self.check_and_record_at(id, now_ms())
    }

    /// Checks and records an identifier at an explicit instant.
    ///
    /// Exposed for deterministic tests; production callers use wall time.
    #[must_use]
    pub fn check_and_record_at(&self, id: &str, now_ms: u64) -> bool {
        let Ok(mut state) = self.state.lock() else {
            // A poisoned guard fails closed: everything is a duplicate.
            return false;
        };
        let horizon = now_ms.saturating_sub(self.window_ms);
        while let Some((accepted_at, _)) = state.order.front() {
            if *accepted_at >= horizon {
                break;
            }
            if let Some((_, expired)) = state.order.pop_front() {
                state.seen.remove(&expired);
            }
        }
        if state.seen.contains(id) {
            return false;
        }
        state.order.push_back((now_ms, id.to_string()));
        state.seen.insert(id.to_string());
        true
    }

    /// Returns the number of identifiers currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map_or(0, |state| state.seen.len())
    }

    /// Returns true when no identifiers are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the current wall time in milliseconds since the epoch.
fn now_ms() -> u64 {
    let millis =
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
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

    use super::ReplayGuard;

    /// Tests a fresh id is accepted and its reuse rejected.
    #[test]
    fn test_duplicate_rejected_inside_window() {
        let guard = ReplayGuard::new(300_000);
        assert!(guard.check_and_record_at("r1", 1_000));
        assert!(!guard.check_and_record_at("r1", 2_000));
        assert!(guard.check_and_record_at("r2", 2_000));
    }

    /// Tests identifiers expire once the window passes.
    #[test]
    fn test_id_expires_after_window() {
        let guard = ReplayGuard::new(5_000);
        assert!(guard.check_and_record_at("r1", 1_000));
        assert!(!guard.check_and_record_at("r1", 5_999));
        assert!(guard.check_and_record_at("r1", 6_001));
    }

    /// Tests memory stays bounded by the window.
    #[test]
    fn test_memory_bounded_by_window() {
        let guard = ReplayGuard::new(1_000);
        for index in 0..10_000u64 {
            let id = format!("r{index}");
            assert!(guard.check_and_record_at(&id, index * 10));
        }
        // Only ids accepted within the trailing window survive.
        assert!(guard.len() <= 101);
    }
}
