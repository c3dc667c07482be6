//! Common helpers for integration tests.
//! Some helpers are only used by specific test binaries; allow dead_code to avoid per-binary warnings.
#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, B256};
use alloy::sol_types::abi::TokenSeq;
use alloy::sol_types::{SolCall, SolEvent, SolType, SolValue};
use async_trait::async_trait;
use lane::rpc::cancellable;
use lane::{BlockOracle, ChainClient, DurationHistogram, LaneError, LogFilter, MetricObservation, RawLog, RpcError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lane=debug".parse().unwrap()))
        .with_test_writer()
        .try_init();
}

/// ABI-encode a return tuple the way a function returns it.
pub fn returns<T>(values: T) -> Bytes
where
    T: SolValue,
    for<'a> <T::SolType as SolType>::Token<'a>: TokenSeq<'a>,
{
    values.abi_encode_params().into()
}

/// In-memory chain. `get_logs` filters by topics and block window only, so logs from other
/// addresses reach the client the way a misbehaving node would deliver them.
#[derive(Default)]
pub struct MockChain {
    pub chain_id: u64,
    responses: Mutex<HashMap<(Address, [u8; 4]), Result<Bytes, String>>>,
    logs: Mutex<Vec<RawLog>>,
    timestamps: Mutex<HashMap<u64, u64>>,
    latest: AtomicU64,
    finalized: AtomicU64,
    hang: AtomicBool,
    calls: Mutex<Vec<(Address, [u8; 4])>>,
    pub get_logs_windows: Mutex<Vec<(u64, u64)>>,
    pub get_logs_filters: Mutex<Vec<LogFilter>>,
    pub timestamp_requests: AtomicUsize,
    pub oracle_requests: AtomicUsize,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Self::default()
        }
    }

    /// Answer calls to `C` on `address` with `result`.
    pub fn on_call<C: SolCall>(&self, address: Address, result: Result<Bytes, String>) {
        self.responses
            .lock()
            .unwrap()
            .insert((address, C::SELECTOR), result);
    }

    pub fn set_heads(&self, latest: u64, finalized: u64) {
        self.latest.store(latest, Ordering::SeqCst);
        self.finalized.store(finalized, Ordering::SeqCst);
    }

    pub fn set_timestamp(&self, block: u64, ts: u64) {
        self.timestamps.lock().unwrap().insert(block, ts);
    }

    /// Every remote operation pends until cancelled.
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn push_log(&self, log: RawLog) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn push_event<E: SolEvent>(&self, address: Address, event: &E, block: u64, log_index: u64) {
        self.push_log(event_log(address, event, block, log_index));
    }

    pub fn calls_to<C: SolCall>(&self, address: Address) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == (address, C::SELECTOR))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_logs_count(&self) -> usize {
        self.get_logs_windows.lock().unwrap().len()
    }

    async fn pending_if_hung(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

pub fn event_log<E: SolEvent>(address: Address, event: &E, block: u64, log_index: u64) -> RawLog {
    let data = event.encode_log_data();
    RawLog {
        address,
        topics: data.topics().to_vec(),
        data: data.data.clone(),
        block_number: block,
        tx_hash: B256::with_last_byte(block as u8),
        log_index,
        removed: false,
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn call(
        &self,
        to: Address,
        calldata: Bytes,
        cancel: &CancellationToken,
    ) -> Result<Bytes, LaneError> {
        cancellable(cancel, async {
            self.pending_if_hung().await;
            let mut selector = [0u8; 4];
            selector.copy_from_slice(&calldata[..4]);
            self.calls.lock().unwrap().push((to, selector));
            match self.responses.lock().unwrap().get(&(to, selector)) {
                Some(Ok(bytes)) => Ok(bytes.clone()),
                Some(Err(msg)) => Err(LaneError::remote("eth_call", RpcError::Rpc(msg.clone()))),
                None => Err(LaneError::remote("eth_call", RpcError::Rpc("execution reverted".into()))),
            }
        })
        .await
    }

    async fn get_logs(
        &self,
        filter: &LogFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawLog>, LaneError> {
        cancellable(cancel, async {
            self.pending_if_hung().await;
            self.get_logs_windows
                .lock()
                .unwrap()
                .push((filter.from_block, filter.to_block));
            self.get_logs_filters.lock().unwrap().push(filter.clone());
            Ok(self
                .logs
                .lock()
                .unwrap()
                .iter()
                .filter(|l| filter.matches_topics(&l.topics))
                .filter(|l| (filter.from_block..=filter.to_block).contains(&l.block_number))
                .cloned()
                .collect())
        })
        .await
    }

    async fn block_timestamp(
        &self,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<u64, LaneError> {
        cancellable(cancel, async {
            self.pending_if_hung().await;
            self.timestamp_requests.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .timestamps
                .lock()
                .unwrap()
                .get(&number)
                .copied()
                .unwrap_or(number * 12))
        })
        .await
    }
}

#[async_trait]
impl BlockOracle for MockChain {
    async fn latest_block(&self, cancel: &CancellationToken) -> Result<u64, LaneError> {
        cancellable(cancel, async {
            self.pending_if_hung().await;
            self.oracle_requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.latest.load(Ordering::SeqCst))
        })
        .await
    }

    async fn latest_finalized_block(&self, cancel: &CancellationToken) -> Result<u64, LaneError> {
        cancellable(cancel, async {
            self.pending_if_hung().await;
            self.oracle_requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.finalized.load(Ordering::SeqCst))
        })
        .await
    }
}

/// Histogram that keeps every observation.
#[derive(Default)]
pub struct RecordingHistogram {
    samples: Mutex<Vec<Sample>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub chain_id: u64,
    pub plugin: String,
    pub function: String,
    pub success: bool,
}

impl RecordingHistogram {
    pub fn count(&self, function: &str, success: bool) -> usize {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.function == function && s.success == success)
            .count()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().unwrap().clone()
    }
}

impl DurationHistogram for RecordingHistogram {
    fn observe(&self, o: &MetricObservation<'_>) {
        self.samples.lock().unwrap().push(Sample {
            chain_id: o.chain_id,
            plugin: o.plugin.to_string(),
            function: o.function.to_string(),
            success: o.success,
        });
    }
}
