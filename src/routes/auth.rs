// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-shot OAuth authorization callback.
//!
//! The listener binds a local port, receives exactly one redirect from
//! Strava's consent page and hands the authorization code back to the
//! waiting caller, then shuts down.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::{CallbackError, ScopeValidationError};

/// Path Strava redirects to after consent.
pub const CALLBACK_PATH: &str = "/exchange_token";

/// Scopes the sync needs; the granted set must match exactly.
pub const REQUIRED_SCOPES: [&str; 4] = ["read", "activity:read_all", "profile:read_all", "read_all"];

/// Strava authorization codes are 40 characters.
pub const AUTH_CODE_LEN: usize = 40;

const AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";

/// Consent URL that redirects back to the local listener on `port`.
pub fn authorize_url(client_id: &str, port: u16) -> String {
    let redirect_uri = format!("http://{}:{}{}", Ipv4Addr::LOCALHOST, port, CALLBACK_PATH);
    format!(
        "{}?\
         client_id={}&\
         response_type=code&\
         redirect_uri={}&\
         approval_prompt=force&\
         scope=read_all,profile:read_all,activity:read_all",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(&redirect_uri),
    )
}

/// Query parameters of the consent redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    /// Comma-separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Check the redirect carries a well-formed code and exactly the required scopes.
pub fn validate_callback(params: &CallbackParams) -> Result<String, ScopeValidationError> {
    let code = params
        .code
        .as_deref()
        .ok_or(ScopeValidationError::MissingParameter("code"))?;
    let scope = params
        .scope
        .as_deref()
        .ok_or(ScopeValidationError::MissingParameter("scope"))?;

    let granted: BTreeSet<&str> = scope
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let required: BTreeSet<&str> = REQUIRED_SCOPES.into_iter().collect();

    if granted != required {
        return Err(ScopeValidationError::ScopeMismatch {
            received: granted.into_iter().map(str::to_string).collect(),
        });
    }

    if code.chars().count() != AUTH_CODE_LEN {
        return Err(ScopeValidationError::InvalidCode(code.chars().count()));
    }

    Ok(code.to_string())
}

type CallbackOutcome = Result<String, ScopeValidationError>;

/// Slot holding the sender until the first callback consumes it.
type Rendezvous = Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>;

/// Router serving the callback path; the first request's outcome goes to `tx`.
pub fn callback_router(tx: oneshot::Sender<CallbackOutcome>) -> Router {
    let slot: Rendezvous = Arc::new(Mutex::new(Some(tx)));

    Router::new()
        .route(CALLBACK_PATH, get(exchange_token))
        .layer(TraceLayer::new_for_http())
        .with_state(slot)
}

async fn exchange_token(
    State(slot): State<Rendezvous>,
    Query(params): Query<CallbackParams>,
) -> Result<&'static str, ScopeValidationError> {
    let outcome = validate_callback(&params);

    let sender = slot.lock().ok().and_then(|mut guard| guard.take());
    match sender {
        Some(tx) => {
            // Receiver gone means the waiter timed out; nothing left to do.
            let _ = tx.send(outcome.clone());
        }
        None => tracing::debug!("Ignoring repeated authorization callback"),
    }

    outcome.map(|_| {
        tracing::info!("Authorization code received");
        "Authorization received. You can close this window."
    })
}

/// Local listener waiting for a single authorization callback.
pub struct CallbackListener {
    addr: SocketAddr,
    outcome: oneshot::Receiver<CallbackOutcome>,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
}

impl CallbackListener {
    /// Bind `127.0.0.1:port` (0 picks a free port) and start serving.
    pub async fn bind(port: u16) -> Result<Self, CallbackError> {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
        let addr = listener.local_addr()?;

        let (outcome_tx, outcome) = oneshot::channel();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let app = callback_router(outcome_tx);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(address = %addr, "Authorization callback listener started");

        Ok(Self {
            addr,
            outcome,
            shutdown,
            server,
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the callback or `timeout`, whichever comes first, then stop
    /// the listener.
    pub async fn wait_for_code(self, timeout: Duration) -> Result<String, CallbackError> {
        let received = tokio::time::timeout(timeout, self.outcome).await;

        let _ = self.shutdown.send(());
        match self.server.await {
            Ok(Err(e)) => tracing::warn!(error = %e, "Callback listener exited with error"),
            Err(e) => tracing::warn!(error = %e, "Callback listener task failed"),
            Ok(Ok(())) => {}
        }

        match received {
            Err(_) => Err(CallbackError::Timeout(timeout)),
            Ok(Err(_)) => Err(CallbackError::Aborted),
            Ok(Ok(outcome)) => Ok(outcome?),
        }
    }
}
