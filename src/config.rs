// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Default number of media items fetched per feed.
pub const DEFAULT_FEED_LIMIT: usize = 20;

/// Default length of generated identity tokens.
pub const DEFAULT_IDENTITY_TOKEN_LENGTH: usize = 16;

/// Shortest identity token accepted from the environment.
pub const MIN_IDENTITY_TOKEN_LENGTH: usize = 8;

/// Default number of profiles processed concurrently by maintenance sweeps.
pub const DEFAULT_MAINTENANCE_CONCURRENCY: usize = 8;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Instagram app client ID (public)
    pub instagram_client_id: String,
    /// Redirect URI registered with the Instagram app
    pub instagram_redirect_uri: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Timeout applied to every Instagram request
    pub request_timeout: Duration,
    /// Number of media items fetched per feed
    pub feed_limit: usize,
    /// Length of identity tokens embedded in authorization URLs
    pub identity_token_length: usize,
    /// Profiles processed concurrently by maintenance sweeps
    pub maintenance_concurrency: usize,

    // --- Secrets ---
    /// Instagram app client secret
    pub instagram_client_secret: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            instagram_client_id: "test_client_id".to_string(),
            instagram_redirect_uri: "http://localhost:8080/instagram/callback".to_string(),
            gcp_project_id: "test-project".to_string(),
            request_timeout: Duration::from_secs(10),
            feed_limit: DEFAULT_FEED_LIMIT,
            identity_token_length: DEFAULT_IDENTITY_TOKEN_LENGTH,
            maintenance_concurrency: DEFAULT_MAINTENANCE_CONCURRENCY,
            instagram_client_secret: "test_secret".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            instagram_client_id: env::var("INSTAGRAM_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("INSTAGRAM_CLIENT_ID"))?,
            instagram_redirect_uri: env::var("INSTAGRAM_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("INSTAGRAM_REDIRECT_URI"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            request_timeout: Duration::from_secs(parse_or("INSTAGRAM_REQUEST_TIMEOUT_SECS", 10)?),
            feed_limit: parse_or("INSTAGRAM_FEED_LIMIT", DEFAULT_FEED_LIMIT)?,
            identity_token_length: parse_at_least(
                "IDENTITY_TOKEN_LENGTH",
                DEFAULT_IDENTITY_TOKEN_LENGTH,
                MIN_IDENTITY_TOKEN_LENGTH,
            )?,
            maintenance_concurrency: parse_at_least(
                "MAINTENANCE_CONCURRENCY",
                DEFAULT_MAINTENANCE_CONCURRENCY,
                1,
            )?,

            instagram_client_secret: env::var("INSTAGRAM_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("INSTAGRAM_CLIENT_SECRET"))?,
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Like [`parse_or`], but values below `min` are rejected.
fn parse_at_least(name: &'static str, default: usize, min: usize) -> Result<usize, ConfigError> {
    let value = parse_or(name, default)?;
    if value < min {
        return Err(ConfigError::Invalid(
            name,
            format!("{} (minimum {})", value, min),
        ));
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
