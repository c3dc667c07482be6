//! Chain connection configuration.

use crate::rpc::{ChainClientBuilder, HttpChainClient};
use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

pub const DEFAULT_GETLOGS_MAX_RANGE: u64 = 1000;

/// Connection and scan settings for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// HTTP JSON-RPC endpoint (eth_call, eth_getLogs, eth_getBlockByNumber).
    pub http_url: String,
    /// Chain id reported on every metric sample.
    pub chain_id: u64,
    /// First block any event scan reads from.
    #[serde(default)]
    pub start_block: u64,
    /// Max block range per eth_getLogs request.
    #[serde(default = "default_getlogs_max_range")]
    pub getlogs_max_range: u64,
}

fn default_getlogs_max_range() -> u64 {
    DEFAULT_GETLOGS_MAX_RANGE
}

impl ClientConfig {
    pub fn new(http_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            http_url: http_url.into(),
            chain_id,
            start_block: 0,
            getlogs_max_range: DEFAULT_GETLOGS_MAX_RANGE,
        }
    }

    /// Reads `<PREFIX>_HTTP_URL`, `<PREFIX>_CHAIN_ID`, `<PREFIX>_START_BLOCK` and
    /// `<PREFIX>_GETLOGS_MAX_RANGE`. The last two are optional.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let upper = prefix.trim().to_ascii_uppercase();
        let http_url = get_required_var(&format!("{upper}_HTTP_URL"))?;
        let chain_key = format!("{upper}_CHAIN_ID");
        let chain_id = parse_u64(&chain_key, Some(get_required_var(&chain_key)?))?.unwrap_or_default();
        let start_block_key = format!("{upper}_START_BLOCK");
        let start_block = parse_u64(&start_block_key, get_optional_var(&start_block_key))?.unwrap_or(0);
        let range_key = format!("{upper}_GETLOGS_MAX_RANGE");
        let getlogs_max_range = parse_u64(&range_key, get_optional_var(&range_key))?
            .unwrap_or(DEFAULT_GETLOGS_MAX_RANGE);
        if getlogs_max_range == 0 {
            return Err(ConfigError::ZeroRange { key: range_key });
        }

        Ok(Self {
            http_url,
            chain_id,
            start_block,
            getlogs_max_range,
        })
    }

    /// HTTP client for this chain.
    pub fn http_client(&self) -> Result<HttpChainClient, RpcError> {
        ChainClientBuilder::new()
            .http_url(self.http_url.clone())
            .chain_id(self.chain_id)
            .build()
    }
}

fn get_required_var(key: &str) -> Result<String, ConfigError> {
    get_optional_var(key).ok_or_else(|| ConfigError::MissingVar {
        key: key.to_string(),
    })
}

fn get_optional_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_u64(key: &str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|v| {
            v.parse().map_err(|source| ConfigError::InvalidNumber {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: String },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("`{key}` must be at least 1")]
    ZeroRange { key: String },
}
