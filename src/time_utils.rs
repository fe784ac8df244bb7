// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time conversion.
//!
//! Timestamps are stored as whole Unix seconds, matching what the Strava API
//! accepts for `before`/`after` and returns for `expires_at`.

use chrono::{DateTime, SecondsFormat, Utc};

/// The Unix epoch, used as the "never synced" watermark.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Convert Unix seconds to a UTC timestamp (out-of-range values map to the epoch).
pub fn from_epoch_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Drop sub-second precision so the value survives a round trip through storage.
pub fn truncate_to_secs(date: DateTime<Utc>) -> DateTime<Utc> {
    from_epoch_secs(date.timestamp())
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}
