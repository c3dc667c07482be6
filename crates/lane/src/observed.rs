//! Observed contract facades.
//!
//! [ObservedContract] times a declared subset of a typed handle's reads and reports each one to
//! the contract kind's [DurationHistogram]. Results and errors are returned exactly as produced;
//! nothing is retried, reclassified or timed out here. Reads outside the subset go through
//! [ObservedContract::inner] unobserved.

use crate::contract::{
    CommitStore, DynamicConfig, ExecutionState, OffRamp, OnRamp, PriceRegistry, RateLimiterState,
    TokenPrice,
};
use crate::error::LaneError;
use crate::histogram::{ContractKind, DurationHistogram, MetricObservation};
use crate::rpc::ChainClient;
use alloy::primitives::{Address, B256};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// A typed handle that belongs to one [ContractKind].
pub trait ObservableContract {
    const KIND: ContractKind;
}

impl ObservableContract for OnRamp {
    const KIND: ContractKind = ContractKind::OnRamp;
}

impl ObservableContract for OffRamp {
    const KIND: ContractKind = ContractKind::OffRamp;
}

impl ObservableContract for CommitStore {
    const KIND: ContractKind = ContractKind::CommitStore;
}

impl ObservableContract for PriceRegistry {
    const KIND: ContractKind = ContractKind::PriceRegistry;
}

pub type ObservedOnRamp = ObservedContract<OnRamp>;
pub type ObservedOffRamp = ObservedContract<OffRamp>;
pub type ObservedCommitStore = ObservedContract<CommitStore>;
pub type ObservedPriceRegistry = ObservedContract<PriceRegistry>;

/// Timing decorator around a typed contract handle.
pub struct ObservedContract<C> {
    inner: C,
    chain_id: u64,
    plugin: String,
    histogram: Arc<dyn DurationHistogram>,
}

impl<C> ObservedContract<C> {
    /// Wrap `inner`; `chain_id` is fixed here for the facade's lifetime.
    pub fn new(
        inner: C,
        chain_id: u64,
        plugin: impl Into<String>,
        histogram: Arc<dyn DurationHistogram>,
    ) -> Self {
        Self {
            inner,
            chain_id,
            plugin: plugin.into(),
            histogram,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Await `call`, record one observation labelled with `function` and the outcome, and
    /// hand back the result untouched.
    pub async fn with_observed<T, E, F>(&self, function: &str, call: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let res = call.await;
        self.histogram.observe(&MetricObservation {
            chain_id: self.chain_id,
            plugin: &self.plugin,
            function,
            success: res.is_ok(),
            duration: start.elapsed(),
        });
        res
    }
}

impl<C: ObservableContract> ObservedContract<C> {
    /// Facade reporting to the process-wide histogram of `C`'s kind, labelled with the client's
    /// configured chain id.
    pub fn with_global_histogram(inner: C, client: &dyn ChainClient, plugin: impl Into<String>) -> Self {
        Self::new(inner, client.chain_id(), plugin, C::KIND.histogram())
    }

    pub fn kind(&self) -> ContractKind {
        C::KIND
    }
}

impl ObservedContract<OnRamp> {
    pub fn bind_onramp(
        address: Address,
        client: Arc<dyn ChainClient>,
        plugin: impl Into<String>,
        histogram: Arc<dyn DurationHistogram>,
    ) -> Self {
        let chain_id = client.chain_id();
        Self::new(OnRamp::bind(address, client), chain_id, plugin, histogram)
    }

    pub async fn get_dynamic_config(&self, cancel: &CancellationToken) -> Result<DynamicConfig, LaneError> {
        self.with_observed("GetDynamicConfig", self.inner.get_dynamic_config(cancel))
            .await
    }

    pub async fn get_pool_by_source_token(
        &self,
        dest_chain_selector: u64,
        source_token: Address,
        cancel: &CancellationToken,
    ) -> Result<Address, LaneError> {
        self.with_observed(
            "GetPoolBySourceToken",
            self.inner
                .get_pool_by_source_token(dest_chain_selector, source_token, cancel),
        )
        .await
    }

    pub async fn get_supported_tokens(
        &self,
        dest_chain_selector: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Address>, LaneError> {
        self.with_observed(
            "GetSupportedTokens",
            self.inner.get_supported_tokens(dest_chain_selector, cancel),
        )
        .await
    }

    pub async fn current_rate_limiter_state(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RateLimiterState, LaneError> {
        self.with_observed(
            "CurrentRateLimiterState",
            self.inner.current_rate_limiter_state(cancel),
        )
        .await
    }
}

impl ObservedContract<OffRamp> {
    pub fn bind_offramp(
        address: Address,
        client: Arc<dyn ChainClient>,
        plugin: impl Into<String>,
        histogram: Arc<dyn DurationHistogram>,
    ) -> Self {
        let chain_id = client.chain_id();
        Self::new(OffRamp::bind(address, client), chain_id, plugin, histogram)
    }

    pub async fn get_supported_tokens(&self, cancel: &CancellationToken) -> Result<Vec<Address>, LaneError> {
        self.with_observed("GetSupportedTokens", self.inner.get_supported_tokens(cancel))
            .await
    }

    pub async fn get_destination_token(
        &self,
        source_token: Address,
        cancel: &CancellationToken,
    ) -> Result<Address, LaneError> {
        self.with_observed(
            "GetDestinationToken",
            self.inner.get_destination_token(source_token, cancel),
        )
        .await
    }

    pub async fn current_rate_limiter_state(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RateLimiterState, LaneError> {
        self.with_observed(
            "CurrentRateLimiterState",
            self.inner.current_rate_limiter_state(cancel),
        )
        .await
    }

    pub async fn get_sender_nonce(&self, sender: Address, cancel: &CancellationToken) -> Result<u64, LaneError> {
        self.with_observed("GetSenderNonce", self.inner.get_sender_nonce(sender, cancel))
            .await
    }

    pub async fn get_execution_state(
        &self,
        sequence_number: u64,
        cancel: &CancellationToken,
    ) -> Result<ExecutionState, LaneError> {
        self.with_observed(
            "GetExecutionState",
            self.inner.get_execution_state(sequence_number, cancel),
        )
        .await
    }
}

impl ObservedContract<CommitStore> {
    pub fn bind_commit_store(
        address: Address,
        client: Arc<dyn ChainClient>,
        plugin: impl Into<String>,
        histogram: Arc<dyn DurationHistogram>,
    ) -> Self {
        let chain_id = client.chain_id();
        Self::new(CommitStore::bind(address, client), chain_id, plugin, histogram)
    }

    pub async fn get_expected_next_sequence_number(&self, cancel: &CancellationToken) -> Result<u64, LaneError> {
        self.with_observed(
            "GetExpectedNextSequenceNumber",
            self.inner.get_expected_next_sequence_number(cancel),
        )
        .await
    }

    pub async fn is_paused(&self, cancel: &CancellationToken) -> Result<bool, LaneError> {
        self.with_observed("IsPaused", self.inner.is_paused(cancel)).await
    }

    pub async fn is_blessed(&self, root: B256, cancel: &CancellationToken) -> Result<bool, LaneError> {
        self.with_observed("IsBlessed", self.inner.is_blessed(root, cancel))
            .await
    }

    pub async fn is_down(&self, cancel: &CancellationToken) -> Result<bool, LaneError> {
        self.with_observed("IsDown", self.inner.is_down(cancel)).await
    }
}

impl ObservedContract<PriceRegistry> {
    pub fn bind_price_registry(
        address: Address,
        client: Arc<dyn ChainClient>,
        plugin: impl Into<String>,
        histogram: Arc<dyn DurationHistogram>,
    ) -> Self {
        let chain_id = client.chain_id();
        Self::new(PriceRegistry::bind(address, client), chain_id, plugin, histogram)
    }

    pub async fn get_token_prices(
        &self,
        tokens: Vec<Address>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TokenPrice>, LaneError> {
        self.with_observed("GetTokenPrices", self.inner.get_token_prices(tokens, cancel))
            .await
    }

    pub async fn get_fee_tokens(&self, cancel: &CancellationToken) -> Result<Vec<Address>, LaneError> {
        self.with_observed("GetFeeTokens", self.inner.get_fee_tokens(cancel))
            .await
    }
}
