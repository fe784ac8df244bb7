// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental, paginated activity retrieval.

use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, TryStreamExt};

use crate::error::FetchError;
use crate::services::strava::{ActivityWindow, RawActivity, StravaClient, StravaTransport};
use crate::time_utils::epoch;

/// Largest page the listing endpoint serves.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Pages through `/athlete/activities` for one access token.
pub struct ActivityFetcher<'a, T> {
    client: &'a StravaClient<T>,
    per_page: u32,
}

impl<'a, T: StravaTransport> ActivityFetcher<'a, T> {
    pub fn new(client: &'a StravaClient<T>, per_page: u32) -> Self {
        Self { client, per_page }
    }

    /// Lazily fetch every activity started after `watermark` and before `now`.
    ///
    /// Pages are requested one at a time as the stream is polled, starting at
    /// page 1, until the first empty page. Any failed page ends the stream
    /// with an error; items already yielded stay yielded.
    pub fn fetch_since(
        &self,
        access_token: &'a str,
        watermark: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> impl Stream<Item = Result<RawActivity, FetchError>> + 'a {
        self.fetch_pages(access_token, watermark, now)
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, FetchError>)))
            .try_flatten()
    }

    /// Same as [`fetch_since`](Self::fetch_since) but yields whole pages.
    pub fn fetch_pages(
        &self,
        access_token: &'a str,
        watermark: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> impl Stream<Item = Result<Vec<RawActivity>, FetchError>> + 'a {
        let client = self.client;
        let window = ActivityWindow {
            per_page: self.per_page,
            before: now.timestamp(),
            after: (watermark > epoch()).then(|| watermark.timestamp()),
        };

        stream::try_unfold(1u32, move |page| async move {
            let activities = client.list_activities(access_token, &window, page).await?;

            if activities.is_empty() {
                tracing::debug!(page, "Empty page, pagination complete");
                return Ok(None);
            }

            tracing::debug!(page, count = activities.len(), "Fetched activity page");
            Ok::<_, FetchError>(Some((activities, page + 1)))
        })
    }
}
