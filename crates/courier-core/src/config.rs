//! Runtime configuration, read from `COURIER_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_TX_MAX_ATTEMPTS: &str = "COURIER_TX_MAX_ATTEMPTS";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "COURIER_OPERATION_TIMEOUT_MS";
pub const ENV_LOG: &str = "COURIER_LOG";
pub const ENV_DEMO_RIDERS: &str = "COURIER_DEMO_RIDERS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key}: '{value}' is not a valid number")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Attempts an optimistic transaction gets before giving up on contention.
    pub tx_max_attempts: u32,
    /// Upper bound on each repository call.
    pub operation_timeout_ms: u64,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
    /// Riders racing for one delivery in the CLI demo.
    pub demo_riders: usize,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            tx_max_attempts: 5,
            operation_timeout_ms: 5_000,
            log_filter: "info,courier_core=debug".to_string(),
            demo_riders: 8,
        }
    }
}

impl CourierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            tx_max_attempts: parse_or(&lookup, ENV_TX_MAX_ATTEMPTS, defaults.tx_max_attempts)?,
            operation_timeout_ms: parse_or(
                &lookup,
                ENV_OPERATION_TIMEOUT_MS,
                defaults.operation_timeout_ms,
            )?,
            log_filter: lookup(ENV_LOG)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.log_filter),
            demo_riders: parse_or(&lookup, ENV_DEMO_RIDERS, defaults.demo_riders)?,
        })
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}
