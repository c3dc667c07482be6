//! Bound contract handles.
//!
//! [BoundContract] is the generic `bind(address)` + `call(SolCall)` handle. The typed handles
//! ([OnRamp], [OffRamp], [CommitStore], [PriceRegistry]) expose the read operations the rest
//! of the crate (and its callers) use, one remote call each.

use crate::abi::{commit_store, common, offramp, onramp, price_registry};
use crate::error::LaneError;
use crate::rpc::ChainClient;
use crate::version::TypeAndVersion;
use alloy::primitives::aliases::U224;
use alloy::primitives::{Address, B256};
use alloy::sol_types::SolCall;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A contract address bound to a chain connection.
#[derive(Clone)]
pub struct BoundContract {
    address: Address,
    client: Arc<dyn ChainClient>,
}

impl std::fmt::Debug for BoundContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundContract")
            .field("address", &self.address)
            .field("chain_id", &self.client.chain_id())
            .finish()
    }
}

impl BoundContract {
    pub fn bind(address: Address, client: Arc<dyn ChainClient>) -> Self {
        Self { address, client }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    pub fn chain_id(&self) -> u64 {
        self.client.chain_id()
    }

    /// ABI-encode `call`, run it with `eth_call`, decode the return.
    pub async fn call<C: SolCall>(
        &self,
        call: &C,
        cancel: &CancellationToken,
    ) -> Result<C::Return, LaneError> {
        let out = self
            .client
            .call(self.address, call.abi_encode().into(), cancel)
            .await
            .map_err(|e| e.with_context(C::SIGNATURE))?;
        C::abi_decode_returns(&out, true).map_err(|e| LaneError::remote(C::SIGNATURE, e))
    }

    /// Raw `typeAndVersion()` string.
    pub async fn raw_type_and_version(&self, cancel: &CancellationToken) -> Result<String, LaneError> {
        Ok(self.call(&common::typeAndVersionCall {}, cancel).await?._0)
    }

    pub async fn type_and_version(&self, cancel: &CancellationToken) -> Result<TypeAndVersion, LaneError> {
        TypeAndVersion::parse(&self.raw_type_and_version(cancel).await?)
    }
}

/// Snapshot of a token bucket rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimiterState {
    pub tokens: u128,
    pub last_updated: u32,
    pub is_enabled: bool,
    pub capacity: u128,
    pub rate: u128,
}

impl From<onramp::TokenBucket> for RateLimiterState {
    fn from(b: onramp::TokenBucket) -> Self {
        Self {
            tokens: b.tokens,
            last_updated: b.lastUpdated,
            is_enabled: b.isEnabled,
            capacity: b.capacity,
            rate: b.rate,
        }
    }
}

impl From<offramp::TokenBucket> for RateLimiterState {
    fn from(b: offramp::TokenBucket) -> Self {
        Self {
            tokens: b.tokens,
            last_updated: b.lastUpdated,
            is_enabled: b.isEnabled,
            capacity: b.capacity,
            rate: b.rate,
        }
    }
}

/// Canonical (current-version) on-ramp dynamic configuration.
///
/// Values resolved from an older contract leave the fields that version does not define at
/// zero; check the contract version before treating zero as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DynamicConfig {
    pub router: Address,
    pub max_tokens_length: u16,
    pub dest_gas_overhead: u32,
    pub dest_gas_per_payload_byte: u16,
    pub dest_data_availability_overhead_gas: u32,
    pub dest_gas_per_data_availability_byte: u16,
    pub dest_data_availability_multiplier_bps: u16,
    pub price_registry: Address,
    pub max_data_size: u32,
    pub max_gas_limit: u64,
    pub default_token_fee_usd_cents: u16,
    pub default_token_dest_gas_overhead: u32,
    pub default_token_dest_bytes_overhead: u32,
    pub enforce_out_of_order: bool,
}

impl From<onramp::DynamicConfig> for DynamicConfig {
    fn from(c: onramp::DynamicConfig) -> Self {
        Self {
            router: c.router,
            max_tokens_length: c.maxNumberOfTokensPerMsg,
            dest_gas_overhead: c.destGasOverhead,
            dest_gas_per_payload_byte: c.destGasPerPayloadByte,
            dest_data_availability_overhead_gas: c.destDataAvailabilityOverheadGas,
            dest_gas_per_data_availability_byte: c.destGasPerDataAvailabilityByte,
            dest_data_availability_multiplier_bps: c.destDataAvailabilityMultiplierBps,
            price_registry: c.priceRegistry,
            max_data_size: c.maxDataBytes,
            max_gas_limit: u64::from(c.maxPerMsgGasLimit),
            default_token_fee_usd_cents: c.defaultTokenFeeUSDCents,
            default_token_dest_gas_overhead: c.defaultTokenDestGasOverhead,
            default_token_dest_bytes_overhead: c.defaultTokenDestBytesOverhead,
            enforce_out_of_order: c.enforceOutOfOrder,
        }
    }
}

/// Off-ramp execution state of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Untouched,
    InProgress,
    Success,
    Failure,
    /// A state this crate does not know about.
    Other(u8),
}

impl From<u8> for ExecutionState {
    fn from(raw: u8) -> Self {
        match raw {
            0 => ExecutionState::Untouched,
            1 => ExecutionState::InProgress,
            2 => ExecutionState::Success,
            3 => ExecutionState::Failure,
            other => ExecutionState::Other(other),
        }
    }
}

impl ExecutionState {
    /// Success and failure are final; the message will not be executed again.
    pub fn is_finished(self) -> bool {
        matches!(self, ExecutionState::Success | ExecutionState::Failure)
    }
}

macro_rules! typed_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            contract: BoundContract,
        }

        impl $name {
            pub fn bind(address: Address, client: Arc<dyn ChainClient>) -> Self {
                Self {
                    contract: BoundContract::bind(address, client),
                }
            }

            pub fn address(&self) -> Address {
                self.contract.address()
            }

            pub fn contract(&self) -> &BoundContract {
                &self.contract
            }
        }

        impl From<BoundContract> for $name {
            fn from(contract: BoundContract) -> Self {
                Self { contract }
            }
        }
    };
}

typed_handle!(
    /// Source-chain on-ramp, current binding.
    OnRamp
);
typed_handle!(
    /// Destination-chain off-ramp.
    OffRamp
);
typed_handle!(
    /// Destination-chain commit store.
    CommitStore
);
typed_handle!(PriceRegistry);

impl OnRamp {
    pub async fn get_dynamic_config(&self, cancel: &CancellationToken) -> Result<DynamicConfig, LaneError> {
        let ret = self
            .contract
            .call(&onramp::getDynamicConfigCall {}, cancel)
            .await?;
        Ok(ret._0.into())
    }

    pub async fn get_pool_by_source_token(
        &self,
        dest_chain_selector: u64,
        source_token: Address,
        cancel: &CancellationToken,
    ) -> Result<Address, LaneError> {
        let call = onramp::getPoolBySourceTokenCall {
            destChainSelector: dest_chain_selector,
            sourceToken: source_token,
        };
        Ok(self.contract.call(&call, cancel).await?._0)
    }

    pub async fn get_supported_tokens(
        &self,
        dest_chain_selector: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Address>, LaneError> {
        let call = onramp::getSupportedTokensCall {
            destChainSelector: dest_chain_selector,
        };
        Ok(self.contract.call(&call, cancel).await?._0)
    }

    pub async fn current_rate_limiter_state(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RateLimiterState, LaneError> {
        let r = self
            .contract
            .call(&onramp::currentRateLimiterStateCall {}, cancel)
            .await?;
        Ok(r._0.into())
    }
}

impl OffRamp {
    pub async fn get_supported_tokens(&self, cancel: &CancellationToken) -> Result<Vec<Address>, LaneError> {
        Ok(self
            .contract
            .call(&offramp::getSupportedTokensCall {}, cancel)
            .await?
            ._0)
    }

    pub async fn get_destination_token(
        &self,
        source_token: Address,
        cancel: &CancellationToken,
    ) -> Result<Address, LaneError> {
        let call = offramp::getDestinationTokenCall {
            sourceToken: source_token,
        };
        Ok(self.contract.call(&call, cancel).await?._0)
    }

    pub async fn current_rate_limiter_state(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RateLimiterState, LaneError> {
        let r = self
            .contract
            .call(&offramp::currentRateLimiterStateCall {}, cancel)
            .await?;
        Ok(r._0.into())
    }

    pub async fn get_sender_nonce(&self, sender: Address, cancel: &CancellationToken) -> Result<u64, LaneError> {
        let call = offramp::getSenderNonceCall { sender };
        Ok(self.contract.call(&call, cancel).await?._0)
    }

    pub async fn get_execution_state(
        &self,
        sequence_number: u64,
        cancel: &CancellationToken,
    ) -> Result<ExecutionState, LaneError> {
        let call = offramp::getExecutionStateCall {
            sequenceNumber: sequence_number,
        };
        Ok(self.contract.call(&call, cancel).await?._0.into())
    }
}

impl CommitStore {
    pub async fn get_expected_next_sequence_number(&self, cancel: &CancellationToken) -> Result<u64, LaneError> {
        Ok(self
            .contract
            .call(&commit_store::getExpectedNextSequenceNumberCall {}, cancel)
            .await?
            ._0)
    }

    pub async fn is_paused(&self, cancel: &CancellationToken) -> Result<bool, LaneError> {
        Ok(self
            .contract
            .call(&commit_store::pausedCall {}, cancel)
            .await?
            ._0)
    }

    /// Whether the risk management network has blessed `root`.
    pub async fn is_blessed(&self, root: B256, cancel: &CancellationToken) -> Result<bool, LaneError> {
        let call = commit_store::isBlessedCall { root };
        Ok(self.contract.call(&call, cancel).await?._0)
    }

    /// Paused, or the risk management network reports a curse.
    pub async fn is_down(&self, cancel: &CancellationToken) -> Result<bool, LaneError> {
        let healthy = self
            .contract
            .call(&commit_store::isUnpausedAndARMHealthyCall {}, cancel)
            .await?
            ._0;
        Ok(!healthy)
    }
}

/// USD price of a token with the time it was last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPrice {
    pub value: U224,
    pub timestamp: u32,
}

impl PriceRegistry {
    pub async fn get_token_prices(
        &self,
        tokens: Vec<Address>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TokenPrice>, LaneError> {
        let call = price_registry::getTokenPricesCall { tokens };
        let ret = self.contract.call(&call, cancel).await?;
        Ok(ret
            ._0
            .into_iter()
            .map(|p| TokenPrice {
                value: p.value,
                timestamp: p.timestamp,
            })
            .collect())
    }

    pub async fn get_fee_tokens(&self, cancel: &CancellationToken) -> Result<Vec<Address>, LaneError> {
        Ok(self
            .contract
            .call(&price_registry::getFeeTokensCall {}, cancel)
            .await?
            ._0)
    }
}
