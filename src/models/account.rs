// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorized account and its OAuth token state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::token::is_expired;
use crate::time_utils::epoch;

/// OAuth application credentials issued by Strava.
///
/// Each athlete registers their own API application, so credentials are
/// stored per account rather than globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Access/refresh token pair with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Where an account sits in the token lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    Active,
    Expired,
}

/// Account row (one per authorized athlete).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Strava athlete ID (primary key)
    pub id: String,
    /// Athlete username, if the athlete has set one
    pub username: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    /// Upper bound already covered by a successful sync (epoch = never synced)
    pub last_sync_at: DateTime<Utc>,
}

impl Account {
    /// Build an account from a completed code exchange.
    pub fn authorized(
        id: String,
        username: Option<String>,
        credentials: &ClientCredentials,
        tokens: TokenSet,
    ) -> Self {
        Self {
            id,
            username,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
            last_sync_at: epoch(),
        }
    }

    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }

    pub fn tokens(&self) -> TokenSet {
        TokenSet {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at,
        }
    }

    pub fn token_state(&self, now: DateTime<Utc>) -> TokenState {
        if self.access_token.is_empty() {
            TokenState::Unauthenticated
        } else if is_expired(self.expires_at, now) {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    /// Whether any sync has completed for this account.
    pub fn has_synced(&self) -> bool {
        self.last_sync_at > epoch()
    }
}
