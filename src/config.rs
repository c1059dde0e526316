use std::time::Duration;
use tracing::{info, warn};

use crate::errors::AppError;

const DEFAULT_ENV_FILE: &str = "line.env";
const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_QUEUE_CAPACITY: usize = 64;
const DEFAULT_SHUTDOWN_DRAIN_SECS: u64 = 10;

/// Process configuration, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub channel_secret: String,
    pub channel_token: String,
    pub line_api_base: String,
    pub fetch_timeout: Duration,
    pub queue_capacity: usize,
    pub shutdown_drain: Duration,
}

impl Config {
    /// Load the dotenv file (if any) and read configuration from the environment.
    pub fn from_env() -> Result<Self, AppError> {
        let env_file = std::env::var("ENV_FILE").unwrap_or_else(|_| DEFAULT_ENV_FILE.into());
        match dotenvy::from_filename(&env_file) {
            Ok(path) => info!(path = %path.display(), "Loaded environment file"),
            Err(e) => warn!(file = %env_file, error = %e, "Environment file not loaded"),
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::ConfigError(format!("{key} is not set")))
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            channel_secret: required("LINE_BOT_CHANNEL_SECRET")?,
            channel_token: required("LINE_BOT_CHANNEL_TOKEN")?,
            line_api_base: lookup("LINE_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_LINE_API_BASE.into()),
            fetch_timeout: Duration::from_secs(
                lookup("FETCH_TIMEOUT_SECS")
                    .and_then(|v| v.parse::<u64>().ok())
                    .filter(|v| *v > 0)
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            queue_capacity: lookup("QUEUE_CAPACITY")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            shutdown_drain: Duration::from_secs(
                lookup("SHUTDOWN_DRAIN_SECS")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_DRAIN_SECS),
            ),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        channel_secret: "test-secret".into(),
        channel_token: "test-token".into(),
        line_api_base: DEFAULT_LINE_API_BASE.into(),
        fetch_timeout: Duration::from_secs(1),
        queue_capacity: 8,
        shutdown_drain: Duration::from_secs(1),
    }
}
