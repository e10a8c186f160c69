use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_FEED_BASE_URL: &str = "https://apigo.afetharita.com";

/// Application configuration loaded from environment variables.
/// Cache sizing is deliberately absent: it is fixed at startup in code.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Upstream feed
    pub feed_base_url: String,
    pub feed_api_key: Option<String>,

    // Web server
    pub api_host: String,
    pub api_port: u16,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            feed_base_url: env::var("FEED_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_FEED_BASE_URL.to_string()),
            feed_api_key: env::var("FEED_API_KEY").ok().filter(|k| !k.is_empty()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: parse_env("API_PORT", 80)?,
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 30)?),
        };

        config.log_keys();
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{head}...({} chars)", val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        tracing::info!("  FEED_BASE_URL: {}", self.feed_base_url);
        tracing::info!(
            "  FEED_API_KEY: {}",
            self.feed_api_key
                .as_deref()
                .map(preview)
                .unwrap_or_else(|| "<not set>".to_string())
        );
        tracing::info!("  REQUEST_TIMEOUT: {}s", self.request_timeout.as_secs());
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
