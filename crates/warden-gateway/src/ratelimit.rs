// crates/warden-gateway/src/ratelimit.rs
// ============================================================================
// Module: Rate Limiter
// Description: Sliding-window caps per action kind plus a global cap.
// Purpose: Bound the rate at which Core can drive outbound actions.
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! Each (action, identity) pair keeps a queue of recent event instants; the
//! global counter keeps its own. A check evicts expired instants lazily,
//! answers from the remaining depth, and records the event only when it is
//! allowed. A zero window disables limiting entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use warden_core::ActionKind;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Rate limiter configuration.
///
/// # Invariants
/// - `window_ms == 0` disables limiting; every check is allowed.
/// - Actions absent from `action_limits` are bounded only by `global_limit`.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Per-action caps within the window.
    pub action_limits: BTreeMap<ActionKind, u32>,
    /// Cap across all actions within the window.
    pub global_limit: u32,
    /// Sliding window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            action_limits: BTreeMap::new(),
            global_limit: 1_000,
            window_ms: 60_000,
        }
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of a rate limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the event is allowed.
    pub allowed: bool,
    /// Milliseconds until the limiting window frees a slot.
    pub reset_ms: u64,
    /// Remaining events in the tighter of the two caps.
    pub remaining: u32,
}

// ============================================================================
// SECTION: Rate Limiter
// ============================================================================

/// Sliding-window state behind one short critical section.
#[derive(Debug, Default)]
struct RateState {
    /// Event instants per (action, identity) key.
    per_key: HashMap<(ActionKind, String), VecDeque<u64>>,
    /// Event instants across all keys.
    global: VecDeque<u64>,
}

/// Sliding-window rate limiter with per-action and global caps.
#[derive(Debug)]
pub struct RateLimiter {
    /// Limiter configuration.
    config: RateLimiterConfig,
    /// Guarded event state.
    state: Mutex<RateState>,
}

impl RateLimiter {
    /// Creates a limiter from configuration.
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RateState::default()),
        }
    }

    /// Checks and, when allowed, records an event at the current wall time.
    #[must_use]
    pub fn check(&self, action: ActionKind, identity: &str) -> RateDecision {
        self.check_at(action, identity, now_ms())
    }

    /// Checks and, when allowed, records an event at an explicit instant.
    ///
    /// Exposed for deterministic tests; production callers use wall time.
    #[must_use]
    pub fn check_at(&self, action: ActionKind, identity: &str, now_ms: u64) -> RateDecision {
        if self.config.window_ms == 0 {
            return RateDecision {
                allowed: true,
                reset_ms: 0,
                remaining: u32::MAX,
            };
        }
        let Ok(mut state) = self.state.lock() else {
            // A poisoned limiter fails closed.
            return RateDecision {
                allowed: false,
                reset_ms: self.config.window_ms,
                remaining: 0,
            };
        };
        let horizon = now_ms.saturating_sub(self.config.window_ms);

        evict(&mut state.global, horizon);
        let key = (action, identity.to_string());
        let key_depth = {
            let events = state.per_key.entry(key.clone()).or_default();
            evict(events, horizon);
            events.len()
        };
        // Drop keys that went idle so the map stays bounded.
        state.per_key.retain(|_, events| !events.is_empty());

        let action_limit = self.config.action_limits.get(&action).copied();
        let action_remaining = action_limit.map(|limit| remaining_slots(limit, key_depth));
        let global_remaining = remaining_slots(self.config.global_limit, state.global.len());

        let action_exhausted = action_remaining == Some(0);
        let global_exhausted = global_remaining == 0;
        if action_exhausted || global_exhausted {
            let oldest = if action_exhausted {
                state.per_key.get(&key).and_then(|events| events.front().copied())
            } else {
                state.global.front().copied()
            };
            let reset_ms = oldest.map_or(self.config.window_ms, |at| {
                at.saturating_add(self.config.window_ms).saturating_sub(now_ms)
            });
            return RateDecision {
                allowed: false,
                reset_ms,
                remaining: 0,
            };
        }

        state.global.push_back(now_ms);
        state.per_key.entry(key).or_default().push_back(now_ms);
        let remaining = action_remaining
            .map_or(global_remaining, |ar| ar.min(global_remaining))
            .saturating_sub(1);
        RateDecision {
            allowed: true,
            reset_ms: 0,
            remaining,
        }
    }
}

/// Removes instants older than the horizon from the front of a queue.
fn evict(events: &mut VecDeque<u64>, horizon: u64) {
    while let Some(front) = events.front() {
        if *front >= horizon {
            break;
        }
        events.pop_front();
    }
}

/// Returns `limit - used`, clamped at zero.
fn remaining_slots(limit: u32, used: usize) -> u32 {
    let used = u32::try_from(used).unwrap_or(u32::MAX);
    limit.saturating_sub(used)
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

    use std::collections::BTreeMap;

    use warden_core::ActionKind;

    use super::RateLimiter;
    use super::RateLimiterConfig;

    /// Builds a limiter with one per-action cap.
    fn limiter(action_cap: u32, global_cap: u32, window_ms: u64) -> RateLimiter {
        let mut action_limits = BTreeMap::new();
        action_limits.insert(ActionKind::EmailSend, action_cap);
        RateLimiter::new(RateLimiterConfig {
            action_limits,
            global_limit: global_cap,
            window_ms,
        })
    }

    /// Tests the N-th request passes and the (N+1)-th is limited.
    #[test]
    fn test_cap_boundary_exact() {
        let limiter = limiter(5, 100, 60_000);
        for index in 0..5 {
            let decision = limiter.check_at(ActionKind::EmailSend, "core", 1_000 + index);
            assert!(decision.allowed, "request {index} should be allowed");
        }
        let decision = limiter.check_at(ActionKind::EmailSend, "core", 1_010);
        assert!(!decision.allowed);
        assert!(decision.reset_ms > 0);
    }

    /// Tests a capped request succeeds again after the window passes.
    #[test]
    fn test_window_eviction_allows_again() {
        let limiter = limiter(1, 100, 10_000);
        assert!(limiter.check_at(ActionKind::EmailSend, "core", 1_000).allowed);
        assert!(!limiter.check_at(ActionKind::EmailSend, "core", 5_000).allowed);
        assert!(limiter.check_at(ActionKind::EmailSend, "core", 11_001).allowed);
    }

    /// Tests the global cap binds across actions.
    #[test]
    fn test_global_cap_binds() {
        let limiter = limiter(100, 3, 60_000);
        assert!(limiter.check_at(ActionKind::EmailSend, "core", 1_000).allowed);
        assert!(limiter.check_at(ActionKind::WebSearch, "core", 1_001).allowed);
        assert!(limiter.check_at(ActionKind::WebFetch, "core", 1_002).allowed);
        assert!(!limiter.check_at(ActionKind::ReminderCreate, "core", 1_003).allowed);
    }

    /// Tests a zero window disables limiting.
    #[test]
    fn test_zero_window_disables() {
        let limiter = limiter(1, 1, 0);
        for index in 0..100 {
            assert!(limiter.check_at(ActionKind::EmailSend, "core", index).allowed);
        }
    }

    /// Tests uncapped actions consume only the global budget.
    #[test]
    fn test_uncapped_action_uses_global_budget() {
        let limiter = limiter(1, 10, 60_000);
        for index in 0..10 {
            assert!(limiter.check_at(ActionKind::WebSearch, "core", 1_000 + index).allowed);
        }
        assert!(!limiter.check_at(ActionKind::WebSearch, "core", 1_020).allowed);
    }

    /// Tests remaining counts down toward the tighter cap.
    #[test]
    fn test_remaining_counts_down() {
        let limiter = limiter(3, 100, 60_000);
        assert_eq!(limiter.check_at(ActionKind::EmailSend, "core", 1_000).remaining, 2);
        assert_eq!(limiter.check_at(ActionKind::EmailSend, "core", 1_001).remaining, 1);
        assert_eq!(limiter.check_at(ActionKind::EmailSend, "core", 1_002).remaining, 0);
    }
}
