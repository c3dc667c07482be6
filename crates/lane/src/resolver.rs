//! On-ramp version resolution and dynamic-config normalization.
//!
//! `typeAndVersion()` selects an entry of [DISPATCH]. Historical versions bind their own ABI to
//! the same address and lift what they define into the canonical [DynamicConfig]; the current
//! version reads the canonical config directly. Unknown versions fail; there is no nearest-match.

use crate::abi::{onramp_v1_0_0, onramp_v1_1_0};
use crate::contract::{BoundContract, DynamicConfig, OnRamp};
use crate::error::LaneError;
use crate::version::TypeAndVersion;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Version string of the canonical binding.
pub const CURRENT_ONRAMP_VERSION: &str = "1.5.0";

/// The one capability the resolver needs from a version-specific binding.
#[async_trait]
pub trait DynamicConfigSource: Send + Sync {
    async fn dynamic_config(&self, cancel: &CancellationToken) -> Result<DynamicConfig, LaneError>;
}

/// On-ramp 1.0.0 binding.
pub struct OnRampV1_0_0(BoundContract);

/// On-ramp 1.1.0 binding.
pub struct OnRampV1_1_0(BoundContract);

/// 1.0.0 predates data availability pricing, default token fees and out-of-order execution.
pub fn lift_v1_0_0(c: onramp_v1_0_0::DynamicConfig) -> DynamicConfig {
    DynamicConfig {
        router: c.router,
        max_tokens_length: c.maxTokensLength,
        dest_gas_overhead: c.destGasOverhead,
        dest_gas_per_payload_byte: c.destGasPerPayloadByte,
        price_registry: c.priceRegistry,
        max_data_size: c.maxDataSize,
        max_gas_limit: c.maxGasLimit,
        ..DynamicConfig::default()
    }
}

/// Same field set as 1.0.0.
pub fn lift_v1_1_0(c: onramp_v1_1_0::DynamicConfig) -> DynamicConfig {
    DynamicConfig {
        router: c.router,
        max_tokens_length: c.maxTokensLength,
        dest_gas_overhead: c.destGasOverhead,
        dest_gas_per_payload_byte: c.destGasPerPayloadByte,
        price_registry: c.priceRegistry,
        max_data_size: c.maxDataSize,
        max_gas_limit: c.maxGasLimit,
        ..DynamicConfig::default()
    }
}

#[async_trait]
impl DynamicConfigSource for OnRampV1_0_0 {
    async fn dynamic_config(&self, cancel: &CancellationToken) -> Result<DynamicConfig, LaneError> {
        let ret = self
            .0
            .call(&onramp_v1_0_0::getDynamicConfigCall {}, cancel)
            .await?;
        Ok(lift_v1_0_0(ret._0))
    }
}

#[async_trait]
impl DynamicConfigSource for OnRampV1_1_0 {
    async fn dynamic_config(&self, cancel: &CancellationToken) -> Result<DynamicConfig, LaneError> {
        let ret = self
            .0
            .call(&onramp_v1_1_0::getDynamicConfigCall {}, cancel)
            .await?;
        Ok(lift_v1_1_0(ret._0))
    }
}

#[async_trait]
impl DynamicConfigSource for OnRamp {
    async fn dynamic_config(&self, cancel: &CancellationToken) -> Result<DynamicConfig, LaneError> {
        self.get_dynamic_config(cancel).await
    }
}

/// Builds the version-specific source for a handle.
pub type Binder = fn(&OnRamp) -> Box<dyn DynamicConfigSource>;

fn bind_v1_0_0(handle: &OnRamp) -> Box<dyn DynamicConfigSource> {
    let rebound = BoundContract::bind(handle.address(), handle.contract().client().clone());
    Box::new(OnRampV1_0_0(rebound))
}

fn bind_v1_1_0(handle: &OnRamp) -> Box<dyn DynamicConfigSource> {
    let rebound = BoundContract::bind(handle.address(), handle.contract().client().clone());
    Box::new(OnRampV1_1_0(rebound))
}

fn bind_current(handle: &OnRamp) -> Box<dyn DynamicConfigSource> {
    Box::new(handle.clone())
}

/// Closed dispatch table: exact version string to binder.
pub const DISPATCH: &[(&str, Binder)] = &[
    ("1.0.0", bind_v1_0_0),
    ("1.1.0", bind_v1_1_0),
    (CURRENT_ONRAMP_VERSION, bind_current),
];

/// Stateless; one value can serve any number of handles concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractVersionResolver;

impl ContractVersionResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn binder_for(version: &str) -> Option<Binder> {
        DISPATCH
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, binder)| *binder)
    }

    pub async fn type_and_version(
        &self,
        handle: &OnRamp,
        cancel: &CancellationToken,
    ) -> Result<TypeAndVersion, LaneError> {
        handle.contract().type_and_version(cancel).await
    }

    /// Discover the deployed version and read its dynamic config in canonical shape.
    pub async fn resolve_dynamic_config(
        &self,
        handle: &OnRamp,
        cancel: &CancellationToken,
    ) -> Result<DynamicConfig, LaneError> {
        let raw = handle.contract().raw_type_and_version(cancel).await?;
        let tv = TypeAndVersion::parse(&raw)?;
        let version = tv.version.to_string();
        let binder =
            Self::binder_for(&version).ok_or_else(|| LaneError::UnsupportedVersion(raw.clone()))?;
        tracing::debug!(
            address = %handle.address(),
            contract_type = %tv.contract_type,
            version = %version,
            "resolving dynamic config"
        );
        binder(handle)
            .dynamic_config(cancel)
            .await
            .map_err(|e| e.with_context(format!("dynamic config of {}", raw)))
    }
}
