// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle for one account.
//!
//! Every transition returns a fresh [`TokenSet`] and writes it to the store
//! before returning, so a crash after the exchange never loses the new
//! refresh token. A failed exchange writes nothing.

use chrono::{DateTime, Utc};

use crate::db::SqliteStore;
use crate::error::AuthExchangeError;
use crate::models::{Account, ClientCredentials, TokenSet, TokenState};
use crate::services::strava::{StravaClient, StravaTransport};
use crate::time_utils::{epoch, from_epoch_secs};

/// `now > expires_at`; a token is still valid at its exact expiry second.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}

/// Access token guaranteed unexpired at the time it was checked.
#[derive(Debug, Clone)]
pub struct ValidToken {
    pub tokens: TokenSet,
    /// Whether obtaining it required a refresh exchange.
    pub refreshed: bool,
}

/// Token exchange and refresh against Strava, persisted through the store.
pub struct TokenLifecycle<'a, T> {
    client: &'a StravaClient<T>,
    store: &'a SqliteStore,
}

impl<'a, T: StravaTransport> TokenLifecycle<'a, T> {
    pub fn new(client: &'a StravaClient<T>, store: &'a SqliteStore) -> Self {
        Self { client, store }
    }

    /// Exchange a one-time authorization code and store the resulting account.
    ///
    /// Re-authorizing an existing athlete replaces credentials and tokens but
    /// keeps the sync watermark.
    pub async fn exchange_initial(
        &self,
        credentials: &ClientCredentials,
        authorization_code: &str,
    ) -> Result<Account, AuthExchangeError> {
        let response = self
            .client
            .exchange_code(credentials, authorization_code)
            .await?;

        let tokens = TokenSet {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: from_epoch_secs(response.expires_at),
        };
        validate_tokens(&tokens)?;

        let mut account = Account::authorized(
            response.athlete.id,
            response.athlete.username,
            credentials,
            tokens,
        );
        if let Some(existing) = self.store.get_account(&account.id)? {
            account.last_sync_at = existing.last_sync_at;
        }

        self.store.upsert_account(&account)?;

        tracing::info!(
            account_id = %account.id,
            username = account.username.as_deref().unwrap_or(""),
            "Authorization code exchanged, account stored"
        );

        Ok(account)
    }

    /// Exchange the account's refresh token for a new token set.
    ///
    /// Works whether or not the current access token has expired. The
    /// returned tokens are already persisted; the caller's `Account` value
    /// is left as it was.
    pub async fn refresh(&self, account: &Account) -> Result<TokenSet, AuthExchangeError> {
        if account.refresh_token.is_empty() {
            return Err(AuthExchangeError::NotAuthorized(account.id.clone()));
        }

        let response = self
            .client
            .refresh_token(&account.credentials(), &account.refresh_token)
            .await?;

        let tokens = TokenSet {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: from_epoch_secs(response.expires_at),
        };
        validate_tokens(&tokens)?;

        self.store.update_tokens(&account.id, &tokens)?;

        tracing::info!(
            account_id = %account.id,
            expires_at = %tokens.expires_at,
            "Access token refreshed"
        );

        Ok(tokens)
    }

    /// Return a token usable at `now`, refreshing only if the current one expired.
    pub async fn ensure_fresh(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<ValidToken, AuthExchangeError> {
        match account.token_state(now) {
            TokenState::Unauthenticated => Err(AuthExchangeError::NotAuthorized(account.id.clone())),
            TokenState::Active => Ok(ValidToken {
                tokens: account.tokens(),
                refreshed: false,
            }),
            TokenState::Expired => {
                tracing::info!(account_id = %account.id, "Access token expired, refreshing");
                let tokens = self.refresh(account).await?;
                Ok(ValidToken {
                    tokens,
                    refreshed: true,
                })
            }
        }
    }
}

/// Reject responses that parse but carry unusable values.
fn validate_tokens(tokens: &TokenSet) -> Result<(), AuthExchangeError> {
    if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
        return Err(AuthExchangeError::Malformed(
            "empty access or refresh token".to_string(),
        ));
    }
    if tokens.expires_at == epoch() {
        return Err(AuthExchangeError::Malformed(
            "expires_at is not a valid timestamp".to_string(),
        ));
    }
    Ok(())
}
