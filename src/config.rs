use std::time::Duration;

use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::transport::RetryPolicy;
use crate::types::b58;

pub const ENV_RPC_URL: &str = "RPC_URL";
pub const ENV_WS_URL: &str = "WS_URL";
pub const ENV_TREE_ADDRESSES: &str = "TREE_ADDRESSES";
pub const ENV_FETCH_MAX_ATTEMPTS: &str = "FETCH_MAX_ATTEMPTS";
pub const ENV_FETCH_INITIAL_DELAY_MS: &str = "FETCH_INITIAL_DELAY_MS";
pub const ENV_FETCH_MAX_DELAY_MS: &str = "FETCH_MAX_DELAY_MS";

const MAX_FETCH_ATTEMPTS: u32 = 100;

/// Everything a watcher process needs to know about where to read from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WatchConfig {
    pub rpc_url: String,
    pub ws_url: String,
    pub tree_addresses: Vec<String>,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl WatchConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup. URLs and tree addresses are required, fetch settings
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| Error::Config {
                reason: format!("{key} not set"),
            })
        };

        let mut fetch = FetchConfig::default();
        if let Some(value) = lookup(ENV_FETCH_MAX_ATTEMPTS) {
            fetch.max_attempts = parse_number(ENV_FETCH_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_FETCH_INITIAL_DELAY_MS) {
            fetch.initial_delay_ms = parse_number(ENV_FETCH_INITIAL_DELAY_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_FETCH_MAX_DELAY_MS) {
            fetch.max_delay_ms = parse_number(ENV_FETCH_MAX_DELAY_MS, &value)?;
        }

        let config = Self {
            rpc_url: required(ENV_RPC_URL)?,
            ws_url: required(ENV_WS_URL)?,
            tree_addresses: required(ENV_TREE_ADDRESSES)?
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            fetch,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.rpc_url.trim().is_empty() {
            return Err(config_error("rpc_url cannot be empty"));
        }
        if self.ws_url.trim().is_empty() {
            return Err(config_error("ws_url cannot be empty"));
        }
        if self.tree_addresses.is_empty() {
            return Err(config_error("at least one tree address is required"));
        }
        self.tree_pubkeys()?;
        if self.fetch.max_attempts == 0 || self.fetch.max_attempts > MAX_FETCH_ATTEMPTS {
            return Err(config_error(&format!(
                "fetch max_attempts must be between 1-{MAX_FETCH_ATTEMPTS}"
            )));
        }
        if self.fetch.initial_delay_ms > self.fetch.max_delay_ms {
            return Err(config_error("fetch initial delay must not exceed max delay"));
        }
        Ok(())
    }

    pub fn tree_pubkeys(&self) -> Result<Vec<Pubkey>, Error> {
        self.tree_addresses
            .iter()
            .map(|address| {
                b58::parse_pubkey(address).map_err(|e| Error::Config {
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch.max_attempts,
            initial_delay: Duration::from_millis(self.fetch.initial_delay_ms),
            max_delay: Duration::from_millis(self.fetch.max_delay_ms),
        }
    }
}

fn config_error(reason: &str) -> Error {
    Error::Config {
        reason: reason.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| Error::Config {
        reason: format!("invalid {key}: {e}"),
    })
}
