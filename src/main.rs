// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Sync command line
//!
//! `auth` authorizes an athlete through a one-shot local callback and stores
//! their tokens; `sync` mirrors new activities for every stored athlete.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use strava_sync::{
    config::Config,
    db::SqliteStore,
    models::ClientCredentials,
    routes::{authorize_url, CallbackListener},
    services::{HttpTransport, StravaClient, SyncOrchestrator, TokenLifecycle},
    time_utils::format_utc_rfc3339,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "strava-sync", version, about = "Save data from Strava to a SQLite database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authorize a Strava athlete and store their tokens
    Auth {
        /// SQLite database file
        db_path: PathBuf,
        /// Strava API application Client ID (prompted if omitted)
        #[arg(long, env = "STRAVA_CLIENT_ID")]
        client_id: Option<String>,
        /// Strava API application Client Secret (prompted if omitted)
        #[arg(long, env = "STRAVA_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,
    },
    /// Fetch new activities for every authorized athlete
    Sync {
        /// SQLite database file
        db_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Auth {
            db_path,
            client_id,
            client_secret,
        } => auth(config.with_db_path(db_path), client_id, client_secret).await,
        Command::Sync { db_path } => sync(config.with_db_path(db_path)).await,
    }
}

fn build_client(config: &Config) -> anyhow::Result<StravaClient<HttpTransport>> {
    let transport = HttpTransport::new(config.http_timeout)?;
    Ok(StravaClient::new(
        transport,
        config.api_url.clone(),
        config.oauth_url.clone(),
    ))
}

async fn auth(
    config: Config,
    client_id: Option<String>,
    client_secret: Option<String>,
) -> anyhow::Result<()> {
    let listener = CallbackListener::bind(config.callback_port)
        .await
        .context("Failed to start authorization callback listener")?;

    println!("1. Visit https://www.strava.com/settings/api and create an application");
    println!("2. In the \"Authorization Callback Domain\" field, put \"127.0.0.1\"");
    println!("3. You'll have access to \"Client ID\" and \"Client Secret\" once created");

    let credentials = ClientCredentials {
        client_id: match client_id {
            Some(id) => id,
            None => prompt("Enter Client ID")?,
        },
        client_secret: match client_secret {
            Some(secret) => secret,
            None => prompt("Enter Client Secret")?,
        },
    };

    println!(
        "4. Open link and authorize: {}",
        authorize_url(&credentials.client_id, listener.port())
    );

    let code = listener.wait_for_code(config.callback_timeout).await?;

    let store = SqliteStore::open(&config.db_path)?;
    let client = build_client(&config)?;
    let account = TokenLifecycle::new(&client, &store)
        .exchange_initial(&credentials, &code)
        .await?;

    println!(
        "Authorized athlete {} ({}); token valid until {}",
        account.id,
        account.username.as_deref().unwrap_or("no username"),
        format_utc_rfc3339(account.expires_at)
    );
    Ok(())
}

async fn sync(config: Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(&config.db_path)?;
    let orchestrator = SyncOrchestrator::new(build_client(&config)?, store, config.sync_options());

    let outcomes = orchestrator.sync_all().await?;
    if outcomes.is_empty() {
        println!("No authorized accounts. Run `strava-sync auth` first.");
        return Ok(());
    }

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => println!(
                "{}: {} activities synced up to {}{}",
                report.account_id,
                report.activities_upserted,
                format_utc_rfc3339(report.started_at),
                if report.decode_failures > 0 {
                    format!(" ({} without geometry)", report.decode_failures)
                } else {
                    String::new()
                }
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {:?} phase failed: {}", outcome.account_id, e.phase(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} accounts failed to sync", failed, outcomes.len());
    }
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("{} is required", label);
    }
    Ok(value)
}

/// Initialize structured logging (JSON when `LOG_FORMAT=json`).
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("strava_sync=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}
