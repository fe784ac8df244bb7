// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod fetcher;
pub mod polyline;
pub mod strava;
pub mod sync;
pub mod token;

pub use fetcher::ActivityFetcher;
pub use strava::{HttpTransport, StravaClient, StravaTransport};
pub use sync::{Clock, DecodeFailurePolicy, SyncOptions, SyncOrchestrator, SyncReport, SystemClock};
pub use token::TokenLifecycle;
