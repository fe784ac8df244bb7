//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is read first if present.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::fetcher::DEFAULT_PAGE_SIZE;
use crate::services::strava::{DEFAULT_API_URL, DEFAULT_OAUTH_URL};
use crate::services::sync::{DecodeFailurePolicy, SyncOptions};

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Strava REST API base URL
    pub api_url: String,
    /// Strava OAuth base URL (token endpoint lives under it)
    pub oauth_url: String,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Activities requested per listing page (1..=200)
    pub page_size: u32,
    /// Handling of undecodable polylines
    pub decode_policy: DecodeFailurePolicy,
    /// How long `auth` waits for the browser redirect
    pub callback_timeout: Duration,
    /// Local callback port (0 = pick a free one)
    pub callback_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("strava.db"),
            api_url: DEFAULT_API_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
            decode_policy: DecodeFailurePolicy::Skip,
            callback_timeout: Duration::from_secs(300),
            callback_port: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        let page_size = parse_var("STRAVA_PAGE_SIZE", defaults.page_size)?;
        if !(1..=DEFAULT_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::Invalid {
                key: "STRAVA_PAGE_SIZE",
                value: page_size.to_string(),
            });
        }

        Ok(Self {
            db_path: env::var("STRAVA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            api_url: env::var("STRAVA_API_URL").unwrap_or(defaults.api_url),
            oauth_url: env::var("STRAVA_OAUTH_URL").unwrap_or(defaults.oauth_url),
            http_timeout: Duration::from_secs(parse_var(
                "STRAVA_HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            page_size,
            decode_policy: parse_var("STRAVA_DECODE_FAILURE_POLICY", defaults.decode_policy)?,
            callback_timeout: Duration::from_secs(parse_var(
                "STRAVA_CALLBACK_TIMEOUT_SECS",
                defaults.callback_timeout.as_secs(),
            )?),
            callback_port: parse_var("STRAVA_CALLBACK_PORT", defaults.callback_port)?,
        })
    }

    /// Override the database path (CLI argument wins over the environment).
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            page_size: self.page_size,
            decode_policy: self.decode_policy,
        }
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
