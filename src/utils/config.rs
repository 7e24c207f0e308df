//! Process configuration read from the environment (and `.env`, loaded in `main`).

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_PREFIX: &str = "!";
const DEFAULT_XAI_BASE_URL: &str = "https://api.x.ai/v1";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Errors raised while reading configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config error for {var}: environment variable is required")]
    Missing { var: &'static str },

    #[error("config error for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub xai_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub command_prefix: String,
    pub xai_base_url: String,
    pub openai_base_url: String,
    /// How long in-flight deliveries may run after a shutdown signal.
    pub shutdown_grace: Duration,
}

impl Config {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing {
            var: "DISCORD_TOKEN",
        })?;

        let xai_api_key = get("XAI_API_KEY");
        let openai_api_key = get("OPENAI_API_KEY");
        if xai_api_key.is_none() && openai_api_key.is_none() {
            return Err(ConfigError::Invalid {
                var: "XAI_API_KEY or OPENAI_API_KEY",
                reason: "at least one AI API key must be set".to_string(),
            });
        }
        if openai_api_key.is_none() {
            warn!("OPENAI_API_KEY not set; OpenAI provider overrides are disabled");
        }

        let shutdown_grace = match get("SHUTDOWN_GRACE_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::Invalid {
                    var: "SHUTDOWN_GRACE_SECS",
                    reason: e.to_string(),
                })?,
            None => Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        };

        let config = Self {
            discord_token,
            xai_api_key,
            openai_api_key,
            command_prefix: get("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            xai_base_url: get("XAI_BASE_URL").unwrap_or_else(|| DEFAULT_XAI_BASE_URL.to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            shutdown_grace,
        };
        debug!(
            prefix = %config.command_prefix,
            grace_secs = config.shutdown_grace.as_secs(),
            "configuration loaded"
        );
        Ok(config)
    }
}
