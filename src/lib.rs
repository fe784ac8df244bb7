// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Sync: mirror Strava activity history into SQLite
//!
//! This crate keeps one SQLite database in step with the Strava accounts
//! authorized against it: OAuth token refresh, incremental paginated fetch
//! keyed by a per-account watermark, and decoding of summary polylines into
//! GeoJSON LineStrings.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
