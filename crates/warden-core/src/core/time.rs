// crates/warden-core/src/core/time.rs
// ============================================================================
// Module: Warden Time Model
// Description: RFC 3339 timestamp representation for requests and audit records.
// Purpose: Provide a single parse/format path so signed and hashed strings are stable.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Every timestamp that participates in signing or chain hashing is carried as
//! the exact RFC 3339 string the client supplied; re-formatting could change
//! the bytes under the signature. [`Timestamp`] therefore stores both the
//! parsed instant and the original wire text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing timestamps.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Input is not a valid RFC 3339 instant.
    #[error("invalid rfc 3339 timestamp: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// RFC 3339 instant with its original wire representation preserved.
///
/// # Invariants
/// - `wire` parses to `instant`; the pair is constructed together.
/// - Comparisons use the parsed instant, not the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    /// Parsed UTC instant.
    instant: OffsetDateTime,
    /// Original RFC 3339 text as supplied on the wire.
    wire: String,
}

impl Timestamp {
    /// Parses an RFC 3339 string, preserving the input text.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Parse`] when the input is not valid RFC 3339.
    pub fn parse(input: &str) -> Result<Self, TimeError> {
        let instant = OffsetDateTime::parse(input, &Rfc3339)
            .map_err(|err| TimeError::Parse(err.to_string()))?;
        Ok(Self {
            instant,
            wire: input.to_string(),
        })
    }

    /// Returns the current instant formatted as RFC 3339 UTC.
    ///
    /// Falls back to the epoch representation in the degenerate case where
    /// the current instant cannot be formatted.
    #[must_use]
    pub fn now() -> Self {
        let instant = OffsetDateTime::now_utc();
        match instant.format(&Rfc3339) {
            Ok(wire) => Self { instant, wire },
            Err(_) => Self {
                instant: OffsetDateTime::UNIX_EPOCH,
                wire: "1970-01-01T00:00:00Z".to_string(),
            },
        }
    }

    /// Returns the wire text exactly as supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.wire
    }

    /// Returns the instant as unix milliseconds.
    #[must_use]
    pub fn unix_millis(&self) -> i64 {
        let millis = self.instant.unix_timestamp_nanos() / 1_000_000;
        i64::try_from(millis).unwrap_or(i64::MAX)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.wire.fmt(f)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
