// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
use strava_sync::error::{
    AuthExchangeError, FetchError, GeometryDecodeError, ScopeValidationError, StorageError,
    SyncError, SyncPhase, TransportError,
};

#[test]
fn test_sync_error_phase_mapping() {
    let err: SyncError = AuthExchangeError::NotAuthorized("1".to_string()).into();
    assert_eq!(err.phase(), SyncPhase::TokenExchange);

    let err: SyncError = FetchError::Status {
        page: 3,
        status: 502,
        body: "Bad Gateway".to_string(),
    }
    .into();
    assert_eq!(err.phase(), SyncPhase::Fetch);

    let err = SyncError::Decode {
        activity_id: "9".to_string(),
        source: GeometryDecodeError::Truncated { offset: 4 },
    };
    assert_eq!(err.phase(), SyncPhase::Decode);

    let err: SyncError = StorageError::Poisoned.into();
    assert_eq!(err.phase(), SyncPhase::Persist);
}

#[test]
fn test_sync_error_messages_carry_context() {
    let err: SyncError = FetchError::Transport(TransportError("connection reset".to_string())).into();
    assert_eq!(
        err.to_string(),
        "Fetch failed: Activity request failed: connection reset"
    );

    let err = SyncError::Decode {
        activity_id: "9".to_string(),
        source: GeometryDecodeError::InvalidByte {
            offset: 2,
            byte: b' ',
        },
    };
    assert!(err.to_string().contains("Activity 9"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_storage_error_converts_into_auth_error() {
    let err: AuthExchangeError = StorageError::AccountNotFound("7".to_string()).into();
    assert!(matches!(
        err,
        AuthExchangeError::Storage(StorageError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_scope_error_response_is_forbidden_json() {
    let response = ScopeValidationError::ScopeMismatch {
        received: vec!["read".to_string()],
    }
    .into_response();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_scope");
    assert!(json["details"].as_str().unwrap().contains("read"));
}

#[tokio::test]
async fn test_missing_parameter_response() {
    let response = ScopeValidationError::MissingParameter("code").into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "missing_parameter");
}
