use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::retry::RetryPolicy;

/// Default forum host when `DRAMA_SITE` is unset.
pub const DEFAULT_SITE: &str = "rdrama.net";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Immutable client configuration.
///
/// Passed by value into the client; nothing here is global. Secrets come
/// from env vars (never hardcoded) and a `.env` file is honoured via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Value sent verbatim in the `Authorization` header.
    pub auth_token: String,
    /// Host name of the forum, e.g. `rdrama.net` or `localhost:5000`.
    pub site: String,
    /// `https` when true, `http` otherwise.
    pub https: bool,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Config {
    /// Build a config for the given token and site with default retry settings.
    pub fn new(auth_token: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            site: site.into(),
            https: true,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("drama-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Only the token lacks a default. Call `require_auth` before anything
    /// that talks to the server.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = Self::new(
            env::var("DRAMA_AUTH_TOKEN").unwrap_or_default(),
            env::var("DRAMA_SITE").unwrap_or_else(|_| DEFAULT_SITE.to_string()),
        );

        if let Ok(raw) = env::var("DRAMA_HTTPS") {
            config.https = parse_bool(&raw)
                .with_context(|| format!("DRAMA_HTTPS must be true or false, got {raw:?}"))?;
        }
        if let Ok(raw) = env::var("DRAMA_MAX_RETRIES") {
            config.retry.max_retries = parse_max_retries(&raw)?;
        }
        if let Ok(raw) = env::var("DRAMA_BACKOFF_BASE_MS") {
            config.retry.base_delay = Duration::from_millis(
                raw.parse::<u64>()
                    .with_context(|| format!("DRAMA_BACKOFF_BASE_MS is not a number: {raw:?}"))?,
            );
        }
        if let Ok(raw) = env::var("DRAMA_BACKOFF_MAX_MS") {
            config.retry.max_delay = Duration::from_millis(
                raw.parse::<u64>()
                    .with_context(|| format!("DRAMA_BACKOFF_MAX_MS is not a number: {raw:?}"))?,
            );
        }
        if let Ok(raw) = env::var("DRAMA_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(
                raw.parse::<u64>()
                    .with_context(|| format!("DRAMA_TIMEOUT_SECS is not a number: {raw:?}"))?,
            );
        }

        Ok(config)
    }

    /// Check that an auth token is configured.
    pub fn require_auth(&self) -> Result<()> {
        if self.auth_token.is_empty() {
            anyhow::bail!(
                "DRAMA_AUTH_TOKEN not set. Add it to your .env file.\n\
                 The token is issued when the site approves your API application."
            );
        }
        Ok(())
    }

    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }

    /// `<scheme>://<site>` with no trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.site.trim_end_matches('/'))
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("not a boolean"),
    }
}

/// `none`/`unbounded` means retry rate-limited calls forever.
fn parse_max_retries(raw: &str) -> Result<Option<u32>> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "none" | "unbounded" => Ok(None),
        other => other
            .parse::<u32>()
            .map(Some)
            .with_context(|| format!("DRAMA_MAX_RETRIES must be a number or `none`, got {raw:?}")),
    }
}
