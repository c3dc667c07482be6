//! Chain transport: the [ChainClient] / [BlockOracle] seams and their JSON-RPC implementation.
//!
//! Every round trip is raced against the caller's [CancellationToken]. No timeouts and no
//! retries are applied here; both belong to the caller.

use crate::error::{LaneError, RpcError};
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Raw log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    /// Set by the node when the log was dropped by a reorg.
    pub removed: bool,
}

/// `eth_getLogs` filter over an inclusive block window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: B256,
    /// Accepted values of the first indexed argument. Empty matches any.
    pub topic1: Vec<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    /// Whether `topics` passes the topic part of this filter.
    pub fn matches_topics(&self, topics: &[B256]) -> bool {
        if topics.first() != Some(&self.topic0) {
            return false;
        }
        self.topic1.is_empty() || topics.get(1).is_some_and(|t| self.topic1.contains(t))
    }

    fn to_json(&self) -> Value {
        let mut topics = vec![json!(format!("{:#x}", self.topic0))];
        if !self.topic1.is_empty() {
            let any_of: Vec<String> = self.topic1.iter().map(|t| format!("{t:#x}")).collect();
            topics.push(json!(any_of));
        }
        json!({
            "address": format!("{:#x}", self.address),
            "topics": topics,
            "fromBlock": format!("0x{:x}", self.from_block),
            "toBlock": format!("0x{:x}", self.to_block),
        })
    }
}

/// Minimal capability set the crate needs from a chain connection.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Configured chain id. Never a remote call.
    fn chain_id(&self) -> u64;

    /// `eth_call` against the latest block.
    async fn call(
        &self,
        to: Address,
        calldata: Bytes,
        cancel: &CancellationToken,
    ) -> Result<Bytes, LaneError>;

    async fn get_logs(
        &self,
        filter: &LogFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawLog>, LaneError>;

    /// Unix timestamp (seconds) of block `number`.
    async fn block_timestamp(
        &self,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<u64, LaneError>;
}

/// Block-height / finality oracle.
#[async_trait]
pub trait BlockOracle: Send + Sync {
    async fn latest_block(&self, cancel: &CancellationToken) -> Result<u64, LaneError>;

    async fn latest_finalized_block(&self, cancel: &CancellationToken) -> Result<u64, LaneError>;
}

/// Run `fut` unless `cancel` fires first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, LaneError>
where
    F: Future<Output = Result<T, LaneError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LaneError::Cancelled),
        res = fut => res,
    }
}

/// Builder for [HttpChainClient].
#[derive(Debug, Default)]
pub struct ChainClientBuilder {
    http_url: Option<String>,
    chain_id: Option<u64>,
}

impl ChainClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn http_url(mut self, url: impl Into<String>) -> Self {
        self.http_url = Some(url.into());
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn build(self) -> Result<HttpChainClient, RpcError> {
        let http_url = self
            .http_url
            .ok_or_else(|| RpcError::Decode("http_url required".into()))?;
        let chain_id = self
            .chain_id
            .ok_or_else(|| RpcError::Decode("chain_id required".into()))?;
        let http_client = reqwest::Client::builder().no_proxy().build()?;
        Ok(HttpChainClient {
            http_client,
            http_url,
            chain_id,
            next_id: AtomicU64::new(1),
        })
    }
}

/// JSON-RPC over HTTP.
#[derive(Debug)]
pub struct HttpChainClient {
    http_client: reqwest::Client,
    http_url: String,
    chain_id: u64,
    next_id: AtomicU64,
}

impl HttpChainClient {
    pub fn builder() -> ChainClientBuilder {
        ChainClientBuilder::new()
    }

    pub fn http_url(&self) -> &str {
        &self.http_url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        let resp = self.http_client.post(&self.http_url).json(&body).send().await?;
        let json: Value = resp.json().await?;
        if let Some(err) = json.get("error") {
            return Err(RpcError::Rpc(err.to_string()));
        }
        json.get("result")
            .cloned()
            .ok_or_else(|| RpcError::Decode("Missing result".into()))
    }

    /// `eth_getBlockByNumber(tag, false)`; a null result is an error.
    async fn block_header(&self, tag: &str) -> Result<Value, RpcError> {
        let block = self
            .request("eth_getBlockByNumber", json!([tag, false]))
            .await?;
        if block.is_null() {
            return Err(RpcError::Decode(format!("block {} not found", tag)));
        }
        Ok(block)
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn call(
        &self,
        to: Address,
        calldata: Bytes,
        cancel: &CancellationToken,
    ) -> Result<Bytes, LaneError> {
        let params = json!([{
            "to": format!("{:#x}", to),
            "data": format!("0x{}", hex::encode(&calldata)),
        }, "latest"]);
        cancellable(cancel, async {
            let result = self
                .request("eth_call", params)
                .await
                .map_err(|e| LaneError::remote("eth_call", e))?;
            let s = result
                .as_str()
                .ok_or_else(|| LaneError::remote("eth_call", RpcError::Decode("result not string".into())))?;
            parse_hex_bytes(s).map_err(|e| LaneError::remote("eth_call", e))
        })
        .await
    }

    async fn get_logs(
        &self,
        filter: &LogFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawLog>, LaneError> {
        cancellable(cancel, async {
            let result = self
                .request("eth_getLogs", json!([filter.to_json()]))
                .await
                .map_err(|e| LaneError::remote("eth_getLogs", e))?;
            let arr = result.as_array().ok_or_else(|| {
                LaneError::remote("eth_getLogs", RpcError::Decode("getLogs not array".into()))
            })?;
            arr.iter()
                .map(parse_raw_log)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| LaneError::remote("eth_getLogs", e))
        })
        .await
    }

    async fn block_timestamp(
        &self,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<u64, LaneError> {
        let context = format!("eth_getBlockByNumber({})", number);
        cancellable(cancel, async {
            let block = self
                .block_header(&format!("0x{:x}", number))
                .await
                .map_err(|e| LaneError::remote(context.as_str(), e))?;
            hex_field_u64(&block, "timestamp").map_err(|e| LaneError::remote(context.as_str(), e))
        })
        .await
    }
}

#[async_trait]
impl BlockOracle for HttpChainClient {
    async fn latest_block(&self, cancel: &CancellationToken) -> Result<u64, LaneError> {
        cancellable(cancel, async {
            let result = self
                .request("eth_blockNumber", json!([]))
                .await
                .map_err(|e| LaneError::remote("eth_blockNumber", e))?;
            let s = result.as_str().ok_or_else(|| {
                LaneError::remote("eth_blockNumber", RpcError::Decode("blockNumber not string".into()))
            })?;
            parse_hex_u64(s).map_err(|e| LaneError::remote("eth_blockNumber", e))
        })
        .await
    }

    async fn latest_finalized_block(&self, cancel: &CancellationToken) -> Result<u64, LaneError> {
        cancellable(cancel, async {
            let block = self
                .block_header("finalized")
                .await
                .map_err(|e| LaneError::remote("eth_getBlockByNumber(finalized)", e))?;
            hex_field_u64(&block, "number")
                .map_err(|e| LaneError::remote("eth_getBlockByNumber(finalized)", e))
        })
        .await
    }
}

/// Decode one `eth_getLogs` entry.
pub fn parse_raw_log(log_value: &Value) -> Result<RawLog, RpcError> {
    let address = Address::from_str(str_field(log_value, "address")?)
        .map_err(|e| RpcError::Decode(format!("address: {}", e)))?;
    let topics = log_value
        .get("topics")
        .and_then(|t| t.as_array())
        .ok_or_else(|| RpcError::Decode("Missing topics".into()))?
        .iter()
        .map(|t| {
            let s = t
                .as_str()
                .ok_or_else(|| RpcError::Decode("topic not str".into()))?;
            B256::from_str(s).map_err(|e| RpcError::Decode(format!("topic: {}", e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let data = parse_hex_bytes(str_field(log_value, "data")?)?;
    let block_number = hex_field_u64(log_value, "blockNumber")?;
    let log_index = hex_field_u64(log_value, "logIndex")?;
    let tx_hash = B256::from_str(str_field(log_value, "transactionHash")?)
        .map_err(|e| RpcError::Decode(format!("transactionHash: {}", e)))?;
    let removed = log_value
        .get("removed")
        .and_then(|r| r.as_bool())
        .unwrap_or(false);
    Ok(RawLog {
        address,
        topics,
        data,
        block_number,
        tx_hash,
        log_index,
        removed,
    })
}

fn str_field<'a>(v: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    v.get(key)
        .and_then(|n| n.as_str())
        .ok_or_else(|| RpcError::Decode(format!("Missing {}", key)))
}

fn hex_field_u64(v: &Value, key: &str) -> Result<u64, RpcError> {
    parse_hex_u64(str_field(v, key)?)
}

fn parse_hex_u64(s: &str) -> Result<u64, RpcError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| RpcError::Decode(format!("parse hex u64: {}", e)))
}

fn parse_hex_bytes(s: &str) -> Result<Bytes, RpcError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s)
        .map(Bytes::from)
        .map_err(|e| RpcError::Decode(format!("parse hex bytes: {}", e)))
}
