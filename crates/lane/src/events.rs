//! Confirmation-safe event queries.
//!
//! Every query first fixes a safe upper block from the [BlockOracle] (latest finalized, or
//! latest minus a confirmation depth), then scans `eth_getLogs` from the configured start block
//! up to that bound. Nothing above the bound is ever returned, so a later reorg of the chain head
//! cannot retract a result. No retries; nothing is cached between calls.
//!
//! Each call costs `(upper - start_block) / getlogs_max_range + 1` `eth_getLogs` round trips, so
//! keep `start_block` close to the contract deployment. Ranged queries over events whose
//! sequence number is an indexed topic also pass the wanted sequence numbers to the node, which
//! then returns only matching logs from each window.

use crate::abi::{commit_store, offramp, onramp, onramp_v1_0_0, price_registry};
use crate::config::ClientConfig;
use crate::error::{LaneError, RpcError};
use crate::rpc::{cancellable, BlockOracle, ChainClient, LogFilter, RawLog};
use alloy::primitives::{Address, B256};
use alloy::sol_types::SolEvent;
use futures_util::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Chain position of a decoded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

/// A decoded event and where it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<T> {
    pub data: T,
    pub meta: BlockMeta,
}

/// Decodable log type.
pub trait ChainEvent: Sized + Send {
    fn topic0() -> B256;

    fn from_raw_log(log: &RawLog) -> Result<Self, RpcError>;
}

impl<E: SolEvent + Send> ChainEvent for E {
    fn topic0() -> B256 {
        E::SIGNATURE_HASH
    }

    fn from_raw_log(log: &RawLog) -> Result<Self, RpcError> {
        Ok(E::decode_raw_log(log.topics.iter().copied(), &log.data, true)?)
    }
}

/// Event carrying a per-(chain, contract) sequence number.
pub trait SequencedEvent: ChainEvent {
    /// Set when the sequence number is the first indexed topic.
    const SEQUENCE_NUMBER_INDEXED: bool = false;

    fn sequence_number(&self) -> u64;
}

impl SequencedEvent for onramp::CCIPSendRequested {
    fn sequence_number(&self) -> u64 {
        self.message.sequenceNumber
    }
}

impl SequencedEvent for onramp_v1_0_0::CCIPSendRequested {
    fn sequence_number(&self) -> u64 {
        self.message.sequenceNumber
    }
}

impl SequencedEvent for offramp::ExecutionStateChanged {
    const SEQUENCE_NUMBER_INDEXED: bool = true;

    fn sequence_number(&self) -> u64 {
        self.sequenceNumber
    }
}

pub type SendRequested = Event<onramp::CCIPSendRequested>;
pub type ExecutionStateChanged = Event<offramp::ExecutionStateChanged>;
pub type CommitReportAccepted = Event<commit_store::ReportAccepted>;
pub type TokenPriceUpdate = Event<price_registry::UsdPerTokenUpdated>;
pub type GasPriceUpdate = Event<price_registry::UsdPerUnitGasUpdated>;

/// Largest sequence range sent to the node as a topic set; wider ranges filter locally.
pub const MAX_SEQUENCE_TOPICS: u64 = 128;

/// Topic encoding of an indexed `uint64`.
pub fn sequence_topic(seq: u64) -> B256 {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&seq.to_be_bytes());
    B256::from(word)
}

/// Upper block boundary for the greater-or-equal query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationPolicy {
    /// Latest finalized block; any confirmation depth is ignored.
    Finalized,
    /// `latest - n`.
    Depth(u64),
}

/// Read-only event client over one chain connection.
#[derive(Clone)]
pub struct EventQueryClient {
    client: Arc<dyn ChainClient>,
    oracle: Arc<dyn BlockOracle>,
    start_block: u64,
    getlogs_max_range: u64,
}

impl EventQueryClient {
    pub fn new(
        client: Arc<dyn ChainClient>,
        oracle: Arc<dyn BlockOracle>,
        start_block: u64,
        getlogs_max_range: u64,
    ) -> Self {
        Self {
            client,
            oracle,
            start_block,
            getlogs_max_range: getlogs_max_range.max(1),
        }
    }

    pub fn from_config(
        config: &ClientConfig,
        client: Arc<dyn ChainClient>,
        oracle: Arc<dyn BlockOracle>,
    ) -> Self {
        Self::new(client, oracle, config.start_block, config.getlogs_max_range)
    }

    pub async fn latest_known_block(&self, cancel: &CancellationToken) -> Result<u64, LaneError> {
        self.oracle.latest_block(cancel).await
    }

    /// Events with sequence number `>= min_seq_num`, ascending by sequence number.
    pub async fn events_with_seq_num_gte<T: SequencedEvent>(
        &self,
        address: Address,
        min_seq_num: u64,
        policy: ConfirmationPolicy,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event<T>>, LaneError> {
        let Some(upper) = self.safe_block(policy, cancel).await? else {
            return Ok(Vec::new());
        };
        let mut events = self
            .scan::<T, _>(address, upper, &[], |ev| ev.sequence_number() >= min_seq_num, cancel)
            .await?;
        events.sort_by_key(|e| e.data.sequence_number());
        Ok(events)
    }

    /// Events with `min_seq_num <= seq <= max_seq_num`, ascending. Always bounded by
    /// confirmation depth; there is no finality mode for ranged queries.
    pub async fn events_with_seq_num_between<T: SequencedEvent>(
        &self,
        address: Address,
        min_seq_num: u64,
        max_seq_num: u64,
        confirmations: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event<T>>, LaneError> {
        if min_seq_num > max_seq_num {
            return Ok(Vec::new());
        }
        let policy = ConfirmationPolicy::Depth(confirmations);
        let Some(upper) = self.safe_block(policy, cancel).await? else {
            return Ok(Vec::new());
        };
        let range = min_seq_num..=max_seq_num;
        let narrow = T::SEQUENCE_NUMBER_INDEXED && max_seq_num - min_seq_num < MAX_SEQUENCE_TOPICS;
        let topic1: Vec<B256> = if narrow {
            range.clone().map(sequence_topic).collect()
        } else {
            Vec::new()
        };
        let mut events = self
            .scan::<T, _>(
                address,
                upper,
                &topic1,
                |ev| range.contains(&ev.sequence_number()),
                cancel,
            )
            .await?;
        events.sort_by_key(|e| e.data.sequence_number());
        Ok(events)
    }

    /// Events from blocks with timestamp strictly after `since_timestamp`, in chain order.
    pub async fn updates_after<T: ChainEvent>(
        &self,
        address: Address,
        since_timestamp: u64,
        confirmations: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event<T>>, LaneError> {
        self.in_chain_order::<T, _>(address, confirmations, |ts| ts > since_timestamp, cancel)
            .await
    }

    /// Commit reports accepted in blocks with timestamp `>= min_timestamp`, in chain order.
    pub async fn accepted_commit_reports_gte_timestamp(
        &self,
        address: Address,
        min_timestamp: u64,
        confirmations: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommitReportAccepted>, LaneError> {
        self.in_chain_order::<commit_store::ReportAccepted, _>(
            address,
            confirmations,
            |ts| ts >= min_timestamp,
            cancel,
        )
        .await
    }

    /// Accepted commit reports whose interval contains `seq_num`, in chain order. A healthy
    /// commit store yields at most one.
    pub async fn commit_report_matching_seq_num(
        &self,
        address: Address,
        seq_num: u64,
        confirmations: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommitReportAccepted>, LaneError> {
        let policy = ConfirmationPolicy::Depth(confirmations);
        let Some(upper) = self.safe_block(policy, cancel).await? else {
            return Ok(Vec::new());
        };
        let mut events = self
            .scan::<commit_store::ReportAccepted, _>(
                address,
                upper,
                &[],
                |ev| {
                    let interval = &ev.report.interval;
                    interval.min <= seq_num && seq_num <= interval.max
                },
                cancel,
            )
            .await?;
        events.sort_by_key(|e| (e.meta.block_number, e.meta.log_index));
        Ok(events)
    }

    async fn in_chain_order<T, F>(
        &self,
        address: Address,
        confirmations: u64,
        keep_timestamp: F,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event<T>>, LaneError>
    where
        T: ChainEvent,
        F: Fn(u64) -> bool,
    {
        let policy = ConfirmationPolicy::Depth(confirmations);
        let Some(upper) = self.safe_block(policy, cancel).await? else {
            return Ok(Vec::new());
        };
        let mut events = self.scan::<T, _>(address, upper, &[], |_| true, cancel).await?;
        events.retain(|e| keep_timestamp(e.meta.block_timestamp));
        events.sort_by_key(|e| (e.meta.block_number, e.meta.log_index));
        Ok(events)
    }

    /// Highest block a query under `policy` may read, or `None` when no block qualifies yet.
    pub async fn safe_block(
        &self,
        policy: ConfirmationPolicy,
        cancel: &CancellationToken,
    ) -> Result<Option<u64>, LaneError> {
        match policy {
            ConfirmationPolicy::Finalized => self
                .oracle
                .latest_finalized_block(cancel)
                .await
                .map(Some),
            ConfirmationPolicy::Depth(n) => {
                let latest = self.oracle.latest_block(cancel).await?;
                Ok(latest.checked_sub(n))
            }
        }
    }

    async fn scan<T, P>(
        &self,
        address: Address,
        upper: u64,
        topic1: &[B256],
        keep: P,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event<T>>, LaneError>
    where
        T: ChainEvent,
        P: Fn(&T) -> bool,
    {
        let mut decoded = Vec::new();
        let mut from = self.start_block;
        while from <= upper {
            let to = from.saturating_add(self.getlogs_max_range - 1).min(upper);
            let filter = LogFilter {
                address,
                topic0: T::topic0(),
                topic1: topic1.to_vec(),
                from_block: from,
                to_block: to,
            };
            let logs = self.client.get_logs(&filter, cancel).await?;
            let raw_count = logs.len();
            for log in logs {
                if log.removed || log.address != address || log.block_number > upper {
                    tracing::warn!(
                        block = log.block_number,
                        log_index = log.log_index,
                        removed = log.removed,
                        "discarding log outside query bounds"
                    );
                    continue;
                }
                if !filter.matches_topics(&log.topics) {
                    continue;
                }
                let ev = T::from_raw_log(&log).map_err(|e| {
                    LaneError::remote(
                        format!("decode log {}:{}", log.tx_hash, log.log_index),
                        e,
                    )
                })?;
                if keep(&ev) {
                    decoded.push((ev, log));
                }
            }
            tracing::debug!(raw_count, from, to, "scanned logs");
            if to == u64::MAX {
                break;
            }
            from = to + 1;
        }

        let timestamps = self.block_timestamps(&decoded, cancel).await?;
        Ok(decoded
            .into_iter()
            .map(|(data, log)| Event {
                meta: BlockMeta {
                    block_number: log.block_number,
                    block_timestamp: timestamps
                        .get(&log.block_number)
                        .copied()
                        .unwrap_or_default(),
                    tx_hash: log.tx_hash,
                    log_index: log.log_index,
                },
                data,
            })
            .collect())
    }

    /// Timestamps of the distinct blocks in `decoded`, fetched concurrently.
    async fn block_timestamps<T>(
        &self,
        decoded: &[(T, RawLog)],
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<u64, u64>, LaneError> {
        let mut blocks: Vec<u64> = decoded.iter().map(|(_, log)| log.block_number).collect();
        blocks.sort_unstable();
        blocks.dedup();
        let client = &self.client;
        let fetches = blocks.iter().map(|&n| async move {
            client.block_timestamp(n, cancel).await.map(|ts| (n, ts))
        });
        let pairs = cancellable(cancel, try_join_all(fetches)).await?;
        Ok(pairs.into_iter().collect())
    }
}
