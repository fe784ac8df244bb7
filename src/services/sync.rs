// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity synchronization.
//!
//! Handles the core workflow for one account:
//! 1. Refresh the access token if it expired
//! 2. Stream new activities since the last watermark
//! 3. Decode each summary polyline to GeoJSON
//! 4. Store the batch and advance the watermark in one transaction

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use futures_util::TryStreamExt;

use crate::db::SqliteStore;
use crate::error::{StorageError, SyncError};
use crate::models::{Account, Activity};
use crate::services::fetcher::{ActivityFetcher, DEFAULT_PAGE_SIZE};
use crate::services::polyline;
use crate::services::strava::{RawActivity, StravaClient, StravaTransport};
use crate::services::token::TokenLifecycle;
use crate::time_utils::truncate_to_secs;

/// What to do with an activity whose polyline cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeFailurePolicy {
    /// Log it, store the activity without geometry, keep going.
    #[default]
    Skip,
    /// Fail the whole sync; nothing is stored and the watermark stays put.
    Abort,
}

impl FromStr for DecodeFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!("expected 'skip' or 'abort', got '{}'", other)),
        }
    }
}

impl fmt::Display for DecodeFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

/// Tunables for a sync pass.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub page_size: u32,
    pub decode_policy: DecodeFailurePolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            decode_policy: DecodeFailurePolicy::default(),
        }
    }
}

/// Source of the sync-start time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Result of a successful sync.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub account_id: String,
    pub activities_upserted: usize,
    /// Activities stored without geometry under [`DecodeFailurePolicy::Skip`].
    pub decode_failures: usize,
    pub token_refreshed: bool,
    /// New watermark.
    pub started_at: DateTime<Utc>,
}

/// Per-account result of [`SyncOrchestrator::sync_all`].
#[derive(Debug)]
pub struct AccountOutcome {
    pub account_id: String,
    pub result: Result<SyncReport, SyncError>,
}

/// Composes token lifecycle, fetching, decoding and persistence.
pub struct SyncOrchestrator<T> {
    client: StravaClient<T>,
    store: SqliteStore,
    options: SyncOptions,
    clock: Box<dyn Clock>,
}

impl<T: StravaTransport> SyncOrchestrator<T> {
    pub fn new(client: StravaClient<T>, store: SqliteStore, options: SyncOptions) -> Self {
        Self {
            client,
            store,
            options,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Sync one account to completion.
    ///
    /// The watermark becomes the sync-start time, and only once every fetched
    /// activity is stored. A failure in any phase leaves activities and
    /// watermark as they were, so the next run repeats the same window.
    pub async fn sync(&self, account: &Account) -> Result<SyncReport, SyncError> {
        let started_at = truncate_to_secs(self.clock.now());

        tracing::info!(
            account_id = %account.id,
            since = %account.last_sync_at,
            full_history = !account.has_synced(),
            "Starting activity sync"
        );

        let token = TokenLifecycle::new(&self.client, &self.store)
            .ensure_fresh(account, started_at)
            .await?;

        let fetcher = ActivityFetcher::new(&self.client, self.options.page_size);
        let activities = fetcher.fetch_since(
            &token.tokens.access_token,
            account.last_sync_at,
            started_at,
        );
        futures_util::pin_mut!(activities);

        let mut batch = Vec::new();
        let mut decode_failures = 0;

        while let Some(raw) = activities.try_next().await? {
            let mut activity = to_activity(raw, &account.id);

            if !activity.summary_polyline.is_empty() {
                match polyline::decode_geojson(&activity.summary_polyline) {
                    Ok(geojson) => activity.summary_geojson = Some(geojson),
                    Err(source) => match self.options.decode_policy {
                        DecodeFailurePolicy::Skip => {
                            tracing::warn!(
                                account_id = %account.id,
                                activity_id = %activity.id,
                                error = %source,
                                "Undecodable polyline, storing activity without geometry"
                            );
                            decode_failures += 1;
                        }
                        DecodeFailurePolicy::Abort => {
                            return Err(SyncError::Decode {
                                activity_id: activity.id,
                                source,
                            });
                        }
                    },
                }
            }

            batch.push(activity);
        }

        let activities_upserted = self.store.commit_sync(&account.id, &batch, started_at)?;

        tracing::info!(
            account_id = %account.id,
            activities = activities_upserted,
            decode_failures,
            token_refreshed = token.refreshed,
            "Activity sync complete"
        );

        Ok(SyncReport {
            account_id: account.id.clone(),
            activities_upserted,
            decode_failures,
            token_refreshed: token.refreshed,
            started_at,
        })
    }

    /// Sync every stored account concurrently.
    ///
    /// One account failing does not stop the others; each outcome is returned.
    pub async fn sync_all(&self) -> Result<Vec<AccountOutcome>, StorageError> {
        let accounts = self.store.list_accounts()?;
        tracing::info!(count = accounts.len(), "Syncing accounts");

        let outcomes = join_all(accounts.iter().map(|account| async move {
            let result = self.sync(account).await;
            if let Err(e) = &result {
                tracing::error!(
                    account_id = %account.id,
                    phase = ?e.phase(),
                    error = %e,
                    "Account sync failed"
                );
            }
            AccountOutcome {
                account_id: account.id.clone(),
                result,
            }
        }))
        .await;

        Ok(outcomes)
    }
}

/// Map a listing record onto an activity row (geometry filled in later).
fn to_activity(raw: RawActivity, account_id: &str) -> Activity {
    Activity {
        id: raw.id,
        kind: raw.kind,
        name: raw.name,
        distance: raw.distance,
        moving_time: raw.moving_time,
        elapsed_time: raw.elapsed_time,
        start_date: raw.start_date,
        start_date_local: raw.start_date_local,
        country: non_empty(raw.location_country),
        city: non_empty(raw.location_city),
        state: non_empty(raw.location_state),
        average_speed: raw.average_speed,
        summary_polyline: raw.map.summary_polyline.unwrap_or_default(),
        summary_geojson: None,
        account_id: account_id.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
