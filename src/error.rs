// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for every phase of a sync, plus the authorization callback.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

/// Failure of the underlying HTTP capability (connect, timeout, body read).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Token endpoint rejected the exchange or answered with an unexpected shape.
#[derive(Debug, thiserror::Error)]
pub enum AuthExchangeError {
    #[error("Token request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Token endpoint returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected token response: {0}")]
    Malformed(String),

    #[error("Account {0} has not completed authorization")]
    NotAuthorized(String),

    #[error("Failed to persist tokens: {0}")]
    Storage(#[from] StorageError),
}

/// Activity listing failed part-way through pagination.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Activity request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Activity page {page} returned HTTP {status}: {body}")]
    Status { page: u32, status: u16, body: String },

    #[error("Activity page {page} could not be parsed: {reason}")]
    Malformed { page: u32, reason: String },
}

/// A summary polyline that does not follow the encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryDecodeError {
    #[error("Polyline ends mid-value at byte {offset}")]
    Truncated { offset: usize },

    #[error("Polyline byte {byte:#04x} at offset {offset} is outside the encoding range")]
    InvalidByte { offset: usize, byte: u8 },

    #[error("Polyline value starting before offset {offset} overflows 64 bits")]
    Overflow { offset: usize },
}

/// The authorization callback did not carry a usable code and scope set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeValidationError {
    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Granted scopes {received:?} do not match the required set")]
    ScopeMismatch { received: Vec<String> },

    #[error("Authorization code has unexpected length {0}")]
    InvalidCode(usize),
}

/// Local database failure.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    Poisoned,

    #[error("Account not found: {0}")]
    AccountNotFound(String),
}

/// Outcome of waiting for the one-time authorization callback.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("Callback listener I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No authorization callback received within {0:?}")]
    Timeout(Duration),

    #[error("Authorization callback rejected: {0}")]
    Rejected(#[from] ScopeValidationError),

    #[error("Callback listener stopped before a code arrived")]
    Aborted,
}

/// Phase of a sync attempt that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    TokenExchange,
    Fetch,
    Decode,
    Persist,
}

/// Structured failure of one account's sync.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Token exchange failed: {0}")]
    TokenExchange(#[from] AuthExchangeError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Activity {activity_id} has an undecodable polyline: {source}")]
    Decode {
        activity_id: String,
        #[source]
        source: GeometryDecodeError,
    },

    #[error("Persist failed: {0}")]
    Persist(#[from] StorageError),
}

impl SyncError {
    /// Which phase of the sync produced this error.
    pub fn phase(&self) -> SyncPhase {
        match self {
            SyncError::TokenExchange(_) => SyncPhase::TokenExchange,
            SyncError::Fetch(_) => SyncPhase::Fetch,
            SyncError::Decode { .. } => SyncPhase::Decode,
            SyncError::Persist(_) => SyncPhase::Persist,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ScopeValidationError {
    fn into_response(self) -> Response {
        let error = match &self {
            ScopeValidationError::MissingParameter(_) => "missing_parameter",
            ScopeValidationError::ScopeMismatch { .. } => "invalid_scope",
            ScopeValidationError::InvalidCode(_) => "invalid_code",
        };

        tracing::warn!(error = %self, "Rejecting authorization callback");

        let body = ErrorResponse {
            error: error.to_string(),
            details: Some(self.to_string()),
        };

        (StatusCode::FORBIDDEN, Json(body)).into_response()
    }
}
