//! Off-chain lane reader for cross-chain messaging contracts.
//!
//! - **ContractVersionResolver**: reads an on-ramp's `typeAndVersion()`, dispatches to the
//!   matching historical binding, and returns its dynamic config in the current canonical shape.
//! - **ObservedContract**: wraps typed contract handles so each declared read records one
//!   duration sample labelled by chain, plugin, function and outcome.
//! - **EventQueryClient**: sequence-number and timestamp event queries that never return
//!   anything above a finality or confirmation-depth bound.

pub mod abi;
pub mod config;
pub mod contract;
pub mod error;
pub mod events;
pub mod histogram;
pub mod observed;
pub mod resolver;
pub mod rpc;
pub mod telemetry;
pub mod version;

pub use config::{ClientConfig, ConfigError};
pub use contract::{
    BoundContract, CommitStore, DynamicConfig, ExecutionState, OffRamp, OnRamp, PriceRegistry,
    RateLimiterState, TokenPrice,
};
pub use error::{LaneError, RpcError};
pub use events::{BlockMeta, ChainEvent, ConfirmationPolicy, Event, EventQueryClient, SequencedEvent};
pub use histogram::{
    describe_contract_histograms, ContractHistogram, ContractKind, DurationHistogram,
    MetricObservation,
};
pub use observed::{
    ObservableContract, ObservedCommitStore, ObservedContract, ObservedOffRamp, ObservedOnRamp,
    ObservedPriceRegistry,
};
pub use resolver::{ContractVersionResolver, DynamicConfigSource, CURRENT_ONRAMP_VERSION};
pub use rpc::{BlockOracle, ChainClient, ChainClientBuilder, HttpChainClient, LogFilter, RawLog};
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryError, TelemetryGuard};
pub use version::{ProtocolVersion, TypeAndVersion};
