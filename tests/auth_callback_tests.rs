// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization callback tests: router behavior and the one-shot listener.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use strava_sync::error::{CallbackError, ScopeValidationError};
use strava_sync::routes::{authorize_url, callback_router, CallbackListener};
use tokio::sync::oneshot;
use tower::ServiceExt;

const CODE: &str = "0123456789abcdef0123456789abcdef01234567";
const FULL_SCOPE: &str = "read,activity:read_all,profile:read_all,read_all";

fn callback_request(query: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/exchange_token?{}", query))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_valid_callback_delivers_code() {
    let (tx, rx) = oneshot::channel();
    let app = callback_router(tx);

    let response = app
        .oneshot(callback_request(&format!(
            "state=&code={}&scope={}",
            CODE, FULL_SCOPE
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(rx.await.unwrap(), Ok(CODE.to_string()));
}

#[tokio::test]
async fn test_partial_scope_is_forbidden() {
    let (tx, rx) = oneshot::channel();
    let app = callback_router(tx);

    let response = app
        .oneshot(callback_request(&format!(
            "code={}&scope=read,activity:read_all",
            CODE
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_scope");

    assert!(matches!(
        rx.await.unwrap(),
        Err(ScopeValidationError::ScopeMismatch { .. })
    ));
}

#[tokio::test]
async fn test_missing_code_is_forbidden() {
    let (tx, rx) = oneshot::channel();
    let app = callback_router(tx);

    let response = app
        .oneshot(callback_request(&format!("scope={}", FULL_SCOPE)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        rx.await.unwrap(),
        Err(ScopeValidationError::MissingParameter("code"))
    );
}

#[tokio::test]
async fn test_denied_consent_is_forbidden() {
    let (tx, rx) = oneshot::channel();
    let app = callback_router(tx);

    let response = app
        .oneshot(callback_request("state=&error=access_denied"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(rx.await.unwrap().is_err());
}

#[tokio::test]
async fn test_repeated_callback_is_ignored() {
    let (tx, rx) = oneshot::channel();
    let app = callback_router(tx);
    let query = format!("code={}&scope={}", CODE, FULL_SCOPE);

    let first = app.clone().oneshot(callback_request(&query)).await.unwrap();
    let second = app.oneshot(callback_request(&query)).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(rx.await.unwrap(), Ok(CODE.to_string()));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let (tx, _rx) = oneshot::channel();
    let app = callback_router(tx);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listener_receives_code_over_http() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let url = format!(
        "http://{}/exchange_token?state=&code={}&scope={}",
        listener.local_addr(),
        CODE,
        FULL_SCOPE
    );

    let waiter = tokio::spawn(listener.wait_for_code(Duration::from_secs(10)));

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let code = waiter.await.unwrap().unwrap();
    assert_eq!(code, CODE);
}

#[tokio::test]
async fn test_listener_surfaces_scope_rejection() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let url = format!(
        "http://{}/exchange_token?code={}&scope=read",
        listener.local_addr(),
        CODE
    );

    let waiter = tokio::spawn(listener.wait_for_code(Duration::from_secs(10)));

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        CallbackError::Rejected(ScopeValidationError::ScopeMismatch { .. })
    ));
}

#[tokio::test]
async fn test_listener_times_out() {
    let listener = CallbackListener::bind(0).await.unwrap();
    assert_ne!(listener.port(), 0);

    let err = listener
        .wait_for_code(Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, CallbackError::Timeout(_)));
}

#[tokio::test]
async fn test_redirect_targets_bound_address() {
    let listener = CallbackListener::bind(0).await.unwrap();
    let redirect = format!("http://{}/exchange_token", listener.local_addr());

    let url = authorize_url("12345", listener.port());
    assert!(url.contains(&format!("redirect_uri={}", urlencoding::encode(&redirect))));

    // The redirect target is reachable exactly as written.
    let response = reqwest::get(format!("{}?code=x&scope=read", redirect))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    drop(response);
    assert!(listener.wait_for_code(Duration::from_secs(5)).await.is_err());
}
