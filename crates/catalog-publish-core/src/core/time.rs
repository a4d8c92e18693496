// crates/catalog-publish-core/src/core/time.rs
// ============================================================================
// Module: Catalog Publish Time Model
// Description: Canonical timestamp representation for watermarks and sync stamps.
// Purpose: Provide ordered, replayable time values across pipeline records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Every timestamp that participates in staleness or eligibility decisions is a
//! [`Timestamp`] in unix epoch milliseconds. The runtime never reads the wall
//! clock directly; hosts supply "now" through the [`crate::Clock`] interface.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used for watermarks and sync bookkeeping.
///
/// # Invariants
/// - Values are unix epoch milliseconds supplied by callers.
/// - Ordering is numeric; "newer" means strictly greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Formats the timestamp as RFC 3339 in UTC.
    ///
    /// Out-of-range values fall back to the raw millisecond count.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        let nanos = i128::from(self.0) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .ok()
            .and_then(|value| value.format(&Rfc3339).ok())
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returns the latest of the provided optional timestamps.
///
/// Absent values behave as negative infinity, so they never win.
#[must_use]
pub fn latest_of<I>(values: I) -> Option<Timestamp>
where
    I: IntoIterator<Item = Option<Timestamp>>,
{
    values.into_iter().flatten().max()
}
