// crates/warden-gateway/src/anomaly.rs
// ============================================================================
// Module: Anomaly Detector
// Description: Oversize, burst, and first-seen-domain detection.
// Purpose: Flag requests that need explicit user approval before execution.
// Dependencies: warden-core
// ============================================================================

//! ## Overview
//! The detector answers one question per request: does anything about it
//! warrant a human look? Three signals feed the answer: payload size beyond
//! the cap, a per-identity burst within the burst window, and a target
//! domain the gateway has never contacted. Domains become known only after a
//! successful execution, so a flagged first contact stays flagged until one
//! is approved and completes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use warden_core::ActionKind;
use warden_core::Domain;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Anomaly detector configuration.
///
/// # Invariants
/// - `burst_threshold == 0` disables burst detection.
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// Maximum accepted payload size in bytes.
    pub max_payload_bytes: usize,
    /// Events per (action, identity) that constitute a burst.
    pub burst_threshold: u32,
    /// Burst window length in milliseconds.
    pub burst_window_ms: u64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 1024 * 1024,
            burst_threshold: 30,
            burst_window_ms: 10_000,
        }
    }
}

// ============================================================================
// SECTION: Assessment
// ============================================================================

/// Reason code for an oversize payload.
pub const REASON_PAYLOAD_OVERSIZE: &str = "payload_oversize";
/// Reason code for a burst.
pub const REASON_BURST: &str = "burst";
/// Reason code for a never-seen target domain.
pub const REASON_FIRST_SEEN_DOMAIN: &str = "first_seen_domain";

/// Detector verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyAssessment {
    /// Whether the request needs approval.
    pub anomalous: bool,
    /// Stable reason codes explaining the verdict.
    pub reasons: Vec<String>,
}

// ============================================================================
// SECTION: Detector
// ============================================================================

/// Burst and domain state behind short critical sections.
#[derive(Debug, Default)]
struct AnomalyState {
    /// Domains the gateway has successfully contacted.
    seen_domains: BTreeSet<String>,
    /// Event instants per (action, identity) key.
    bursts: HashMap<(ActionKind, String), VecDeque<u64>>,
}

/// Detector for oversize payloads, bursts, and first-seen domains.
#[derive(Debug)]
pub struct AnomalyDetector {
    /// Detector configuration.
    config: AnomalyConfig,
    /// Guarded detector state.
    state: Mutex<AnomalyState>,
}

impl AnomalyDetector {
    /// Creates a detector pre-seeded with known domains.
    #[must_use]
    pub fn new(config: AnomalyConfig, preseeded: impl IntoIterator<Item = Domain>) -> Self {
        let seen_domains =
            preseeded.into_iter().map(|domain| domain.as_str().to_string()).collect();
        Self {
            config,
            state: Mutex::new(AnomalyState {
                seen_domains,
                bursts: HashMap::new(),
            }),
        }
    }

    /// Assesses a request at the current wall time.
    #[must_use]
    pub fn assess(
        &self,
        action: ActionKind,
        identity: &str,
        payload_bytes: usize,
        target_domain: Option<&Domain>,
    ) -> AnomalyAssessment {
        self.assess_at(action, identity, payload_bytes, target_domain, now_ms())
    }

    /// Assesses a request at an explicit instant.
    ///
    /// Exposed for deterministic tests; production callers use wall time.
    #[must_use]
    pub fn assess_at(
        &self,
        action: ActionKind,
        identity: &str,
        payload_bytes: usize,
        target_domain: Option<&Domain>,
        now_ms: u64,
    ) -> AnomalyAssessment {
        let mut reasons = Vec::new();
        if payload_bytes > self.config.max_payload_bytes {
            reasons.push(REASON_PAYLOAD_OVERSIZE.to_string());
        }

        let Ok(mut state) = self.state.lock() else {
            // A poisoned detector fails closed.
            return AnomalyAssessment {
                anomalous: true,
                reasons: vec!["detector_unavailable".to_string()],
            };
        };

        if self.config.burst_threshold > 0 {
            let horizon = now_ms.saturating_sub(self.config.burst_window_ms);
            let events = state.bursts.entry((action, identity.to_string())).or_default();
            while let Some(front) = events.front() {
                if *front >= horizon {
                    break;
                }
                events.pop_front();
            }
            events.push_back(now_ms);
            let threshold = usize::try_from(self.config.burst_threshold).unwrap_or(usize::MAX);
            if events.len() > threshold {
                reasons.push(REASON_BURST.to_string());
            }
            state.bursts.retain(|_, events| !events.is_empty());
        }

        if let Some(domain) = target_domain
            && !state.seen_domains.contains(domain.as_str())
        {
            reasons.push(REASON_FIRST_SEEN_DOMAIN.to_string());
        }

        AnomalyAssessment {
            anomalous: !reasons.is_empty(),
            reasons,
        }
    }

    /// Marks a domain as seen after a successful execution.
    pub fn mark_domain_seen(&self, domain: &Domain) {
        if let Ok(mut state) = self.state.lock() {
            state.seen_domains.insert(domain.as_str().to_string());
        }
    }

    /// Returns true when the domain has been seen or pre-seeded.
    #[must_use]
    pub fn is_domain_seen(&self, domain: &Domain) -> bool {
        self.state.lock().map_or(false, |state| state.seen_domains.contains(domain.as_str()))
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

    use warden_core::ActionKind;
    use warden_core::Domain;

    use super::AnomalyConfig;
    use super::AnomalyDetector;
    use super::REASON_BURST;
    use super::REASON_FIRST_SEEN_DOMAIN;
    use super::REASON_PAYLOAD_OVERSIZE;

    /// Builds a detector with a small payload cap and burst threshold.
    fn detector(preseeded: &[&str]) -> AnomalyDetector {
        AnomalyDetector::new(
            AnomalyConfig {
                max_payload_bytes: 64,
                burst_threshold: 3,
                burst_window_ms: 1_000,
            },
            preseeded.iter().map(|domain| Domain::new(*domain).unwrap()),
        )
    }

    /// Tests the payload cap is inclusive at the boundary.
    #[test]
    fn test_payload_cap_boundary() {
        let detector = detector(&[]);
        let at_cap = detector.assess_at(ActionKind::ClipboardWrite, "core", 64, None, 1_000);
        assert!(!at_cap.anomalous);
        let over = detector.assess_at(ActionKind::ClipboardWrite, "core", 65, None, 1_001);
        assert!(over.anomalous);
        assert_eq!(over.reasons, vec![REASON_PAYLOAD_OVERSIZE.to_string()]);
    }

    /// Tests crossing the burst threshold flags the request.
    #[test]
    fn test_burst_detection() {
        let detector = detector(&[]);
        for index in 0..3u64 {
            let verdict =
                detector.assess_at(ActionKind::WebSearch, "core", 10, None, 1_000 + index);
            assert!(!verdict.anomalous, "event {index} should pass");
        }
        let verdict = detector.assess_at(ActionKind::WebSearch, "core", 10, None, 1_005);
        assert!(verdict.anomalous);
        assert_eq!(verdict.reasons, vec![REASON_BURST.to_string()]);
        // Outside the burst window the counter has drained.
        let verdict = detector.assess_at(ActionKind::WebSearch, "core", 10, None, 3_000);
        assert!(!verdict.anomalous);
    }

    /// Tests first-seen domains flag until marked seen.
    #[test]
    fn test_first_seen_domain() {
        let detector = detector(&["api.example.com"]);
        let known = Domain::new("api.example.com").unwrap();
        let novel = Domain::new("new.example.net").unwrap();

        let verdict =
            detector.assess_at(ActionKind::ServiceApiCall, "core", 10, Some(&known), 1_000);
        assert!(!verdict.anomalous);

        let verdict =
            detector.assess_at(ActionKind::ServiceApiCall, "core", 10, Some(&novel), 1_001);
        assert!(verdict.anomalous);
        assert_eq!(verdict.reasons, vec![REASON_FIRST_SEEN_DOMAIN.to_string()]);

        detector.mark_domain_seen(&novel);
        let verdict =
            detector.assess_at(ActionKind::ServiceApiCall, "core", 10, Some(&novel), 1_002);
        assert!(!verdict.anomalous);
    }

    /// Tests reasons accumulate when several signals fire.
    #[test]
    fn test_reasons_accumulate() {
        let detector = detector(&[]);
        let novel = Domain::new("new.example.net").unwrap();
        for index in 0..3u64 {
            let _ = detector.assess_at(ActionKind::WebFetch, "core", 10, None, 1_000 + index);
        }
        let verdict =
            detector.assess_at(ActionKind::WebFetch, "core", 100, Some(&novel), 1_004);
        assert!(verdict.anomalous);
        assert_eq!(verdict.reasons.len(), 3);
    }
}
