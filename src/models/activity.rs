// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity model for storage.

use serde::{Deserialize, Serialize};

/// Stored activity row. Each sync replaces the whole row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Strava activity ID (primary key)
    pub id: String,
    /// Activity type (Ride, Run, Hike, etc.)
    #[serde(rename = "type")]
    pub kind: String,
    /// Activity name/title
    pub name: String,
    /// Distance in meters
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: i64,
    /// Elapsed time in seconds
    pub elapsed_time: i64,
    /// Start date/time (ISO 8601, UTC)
    pub start_date: String,
    /// Start date/time in the athlete's local timezone (ISO 8601)
    pub start_date_local: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Average speed in meters per second
    pub average_speed: f64,
    /// Encoded route as received (may be empty)
    pub summary_polyline: String,
    /// GeoJSON LineString decoded from `summary_polyline`
    pub summary_geojson: Option<String>,
    /// Owning account
    pub account_id: String,
}
