// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for token exchange and activity listing.
//!
//! Handles:
//! - Authorization-code and refresh-token exchanges
//! - Paginated activity listing
//! - Strict parsing of response bodies into typed structs
//!
//! The HTTP mechanics live behind [`StravaTransport`] so a retrying or
//! recording transport can be swapped in without touching the sync logic.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::{AuthExchangeError, FetchError, TransportError};
use crate::models::ClientCredentials;

/// Default Strava REST API base URL.
pub const DEFAULT_API_URL: &str = "https://www.strava.com/api/v3";
/// Default Strava OAuth base URL.
pub const DEFAULT_OAUTH_URL: &str = "https://www.strava.com/oauth";

/// Raw HTTP reply: status code plus the undecoded body.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request capability used by the client.
pub trait StravaTransport: Send + Sync {
    /// POST a url-encoded form.
    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> impl Future<Output = Result<HttpReply, TransportError>> + Send;

    /// GET with bearer authorization and query parameters.
    fn get_authorized(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<HttpReply, TransportError>> + Send;
}

/// `reqwest`-backed transport with a bounded per-request timeout.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    async fn into_reply(response: reqwest::Response) -> Result<HttpReply, TransportError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("Failed to read response body: {}", e)))?;
        Ok(HttpReply { status, body })
    }
}

impl StravaTransport for HttpTransport {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpReply, TransportError> {
        let response = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Self::into_reply(response).await
    }

    async fn get_authorized(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<HttpReply, TransportError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Self::into_reply(response).await
    }
}

/// Query window for one activity listing request.
#[derive(Debug, Clone, Copy)]
pub struct ActivityWindow {
    pub per_page: u32,
    /// Unix seconds; only activities that started before this.
    pub before: i64,
    /// Unix seconds; `None` means unbounded history.
    pub after: Option<i64>,
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient<T> {
    transport: T,
    api_url: String,
    oauth_url: String,
}

impl<T: StravaTransport> StravaClient<T> {
    pub fn new(transport: T, api_url: impl Into<String>, oauth_url: impl Into<String>) -> Self {
        Self {
            transport,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            oauth_url: oauth_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Exchange a one-time authorization code for tokens and athlete identity.
    pub async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<TokenExchangeResponse, AuthExchangeError> {
        self.post_token(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AuthExchangeError> {
        self.post_token(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    /// List one page of the athlete's activities.
    pub async fn list_activities(
        &self,
        access_token: &str,
        window: &ActivityWindow,
        page: u32,
    ) -> Result<Vec<RawActivity>, FetchError> {
        let url = format!("{}/athlete/activities", self.api_url);

        let mut query = vec![
            ("per_page", window.per_page.to_string()),
            ("before", window.before.to_string()),
        ];
        if let Some(after) = window.after {
            query.push(("after", after.to_string()));
        }
        query.push(("page", page.to_string()));

        let reply = self
            .transport
            .get_authorized(&url, access_token, &query)
            .await?;

        if !reply.is_success() {
            if reply.status == 429 {
                tracing::warn!(page, "Strava rate limit hit (429)");
            }
            return Err(FetchError::Status {
                page,
                status: reply.status,
                body: reply.body,
            });
        }

        serde_json::from_str(&reply.body).map_err(|e| FetchError::Malformed {
            page,
            reason: e.to_string(),
        })
    }

    async fn post_token<R: DeserializeOwned>(
        &self,
        form: &[(&str, &str)],
    ) -> Result<R, AuthExchangeError> {
        let url = format!("{}/token", self.oauth_url);
        let reply = self.transport.post_form(&url, form).await?;

        if !reply.is_success() {
            tracing::error!(status = reply.status, body = %reply.body, "Strava token exchange failed");
            return Err(AuthExchangeError::Rejected {
                status: reply.status,
                body: reply.body,
            });
        }

        serde_json::from_str(&reply.body).map_err(|e| AuthExchangeError::Malformed(e.to_string()))
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub athlete: StravaAthlete,
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Summary activity from the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawActivity {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub distance: f64,
    pub moving_time: i64,
    pub elapsed_time: i64,
    pub start_date: String,
    pub start_date_local: String,
    #[serde(default)]
    pub location_country: Option<String>,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_state: Option<String>,
    pub average_speed: f64,
    pub map: StravaMap,
}

/// Activity map data.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaMap {
    /// Null for activities recorded without GPS.
    #[serde(default)]
    pub summary_polyline: Option<String>,
}

/// Strava IDs arrive as JSON numbers; accept strings too and store as text.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}
