//! Environment configuration

use crate::assistants::DEFAULT_BASE_URL;
use crate::runtime::{PollTiming, DEFAULT_POLL_INTERVAL};
use crate::state_machine::DEFAULT_MAX_RUN_POLLS;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Settings for `serve`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub port: u16,
    pub api_key: String,
    pub base_url: String,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_or(&lookup, "THREADCHAT_PORT", DEFAULT_PORT)?,
            api_key: lookup("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Settings for `chat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub api_url: String,
    pub thread_id: Option<String>,
    pub assistant_id: Option<String>,
    pub poll_interval: Duration,
    /// `None` when the ceiling is disabled
    pub max_run_polls: Option<u32>,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let poll_ms: u64 = parse_or(
            &lookup,
            "THREADCHAT_POLL_MS",
            u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(1000),
        )?;
        if poll_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "THREADCHAT_POLL_MS",
                value: "0".to_string(),
            });
        }
        let max_run_polls: u32 =
            parse_or(&lookup, "THREADCHAT_MAX_RUN_POLLS", DEFAULT_MAX_RUN_POLLS)?;

        Ok(Self {
            api_url: lookup("THREADCHAT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            thread_id: lookup("THREADCHAT_THREAD_ID"),
            assistant_id: lookup("THREADCHAT_ASSISTANT_ID"),
            poll_interval: Duration::from_millis(poll_ms),
            max_run_polls: (max_run_polls > 0).then_some(max_run_polls),
        })
    }

    pub fn timing(&self) -> PollTiming {
        PollTiming::uniform(self.poll_interval)
    }
}

/// Unset and empty variables both count as absent
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
