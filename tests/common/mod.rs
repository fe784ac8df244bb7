// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use strava_sync::db::SqliteStore;
use strava_sync::error::TransportError;
use strava_sync::models::Account;
use strava_sync::services::strava::HttpReply;
use strava_sync::services::{Clock, StravaClient, StravaTransport};
use strava_sync::time_utils::epoch;

pub const API_URL: &str = "https://strava.test/api/v3";
pub const OAUTH_URL: &str = "https://strava.test/oauth";

/// One request seen by the mock.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub bearer: Option<String>,
    pub params: Vec<(String, String)>,
}

#[allow(dead_code)]
impl RecordedCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct MockState {
    posts: VecDeque<Result<HttpReply, TransportError>>,
    gets: VecDeque<Result<HttpReply, TransportError>>,
    calls: Vec<RecordedCall>,
}

/// Transport replaying scripted replies in order and recording every call.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_post(&self, status: u16, body: Value) {
        self.state.lock().unwrap().posts.push_back(Ok(HttpReply {
            status,
            body: body.to_string(),
        }));
    }

    pub fn push_get(&self, status: u16, body: Value) {
        self.push_get_raw(status, &body.to_string());
    }

    pub fn push_get_raw(&self, status: u16, body: &str) {
        self.state.lock().unwrap().gets.push_back(Ok(HttpReply {
            status,
            body: body.to_string(),
        }));
    }

    pub fn push_get_error(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .gets
            .push_back(Err(TransportError(message.to_string())));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn posts(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.method == "POST").collect()
    }

    pub fn gets(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.method == "GET").collect()
    }
}

impl StravaTransport for MockTransport {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpReply, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method: "POST",
            url: url.to_string(),
            bearer: None,
            params: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        state
            .posts
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted POST reply".to_string())))
    }

    async fn get_authorized(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<HttpReply, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method: "GET",
            url: url.to_string(),
            bearer: Some(access_token.to_string()),
            params: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
        state
            .gets
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted GET reply".to_string())))
    }
}

/// Clock frozen at one instant.
#[allow(dead_code)]
#[derive(Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[allow(dead_code)]
pub fn test_client(transport: &MockTransport) -> StravaClient<MockTransport> {
    StravaClient::new(transport.clone(), API_URL, OAUTH_URL)
}

#[allow(dead_code)]
pub fn test_store() -> SqliteStore {
    SqliteStore::open_in_memory().expect("Failed to open in-memory database")
}

/// Stored account whose token expires `expires_in` after `now`.
#[allow(dead_code)]
pub fn seed_account(store: &SqliteStore, id: &str, now: DateTime<Utc>, expires_in: Duration) -> Account {
    let account = Account {
        id: id.to_string(),
        username: Some(format!("athlete{}", id)),
        client_id: format!("client-{}", id),
        client_secret: format!("secret-{}", id),
        access_token: format!("access-{}", id),
        refresh_token: format!("refresh-{}", id),
        expires_at: now + expires_in,
        last_sync_at: epoch(),
    };
    store.upsert_account(&account).expect("Failed to seed account");
    // Round-trip through storage so timestamps match what sync reads back.
    store.get_account(id).unwrap().unwrap()
}

/// Listing-endpoint activity JSON.
#[allow(dead_code)]
pub fn activity_json(id: u64, polyline: &str) -> Value {
    json!({
        "resource_state": 2,
        "id": id,
        "type": "Ride",
        "name": format!("Ride {}", id),
        "distance": 1000.0 + id as f64,
        "moving_time": 600,
        "elapsed_time": 660,
        "start_date": "2024-06-01T15:00:00Z",
        "start_date_local": "2024-06-01T08:00:00Z",
        "location_country": "United States",
        "location_city": "",
        "location_state": null,
        "average_speed": 1.7,
        "map": { "id": format!("a{}", id), "summary_polyline": polyline, "resource_state": 2 }
    })
}

/// A full page of `count` activities with consecutive IDs from `first_id`.
#[allow(dead_code)]
pub fn activity_page(first_id: u64, count: u64) -> Value {
    Value::Array(
        (first_id..first_id + count)
            .map(|id| activity_json(id, "_p~iF~ps|U_ulLnnqC_mqNvxq`@"))
            .collect(),
    )
}

#[allow(dead_code)]
pub fn token_refresh_json(access: &str, refresh: &str, expires_at: i64) -> Value {
    json!({
        "token_type": "Bearer",
        "access_token": access,
        "refresh_token": refresh,
        "expires_at": expires_at,
        "expires_in": 21600
    })
}
