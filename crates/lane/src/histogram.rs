//! Contract-call duration histograms.
//!
//! One histogram per [ContractKind], shared by every facade of that kind and sliced by the
//! `chainId` / `plugin` / `function` / `success` labels.

use metrics::Label;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Contract kinds with a dedicated duration histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    OnRamp,
    OffRamp,
    CommitStore,
    PriceRegistry,
}

impl ContractKind {
    pub const ALL: [ContractKind; 4] = [
        ContractKind::OnRamp,
        ContractKind::OffRamp,
        ContractKind::CommitStore,
        ContractKind::PriceRegistry,
    ];

    pub fn histogram_name(self) -> &'static str {
        match self {
            ContractKind::OnRamp => "ccip_onramp_contract_rpc_duration_seconds",
            ContractKind::OffRamp => "ccip_offramp_contract_rpc_duration_seconds",
            ContractKind::CommitStore => "ccip_commit_store_contract_rpc_duration_seconds",
            ContractKind::PriceRegistry => "ccip_price_registry_contract_rpc_duration_seconds",
        }
    }

    /// Histogram backed by the process-wide `metrics` recorder.
    pub fn histogram(self) -> Arc<dyn DurationHistogram> {
        Arc::new(ContractHistogram::new(self))
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContractKind::OnRamp => "onramp",
            ContractKind::OffRamp => "offramp",
            ContractKind::CommitStore => "commit_store",
            ContractKind::PriceRegistry => "price_registry",
        };
        f.write_str(s)
    }
}

/// One timed contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricObservation<'a> {
    pub chain_id: u64,
    pub plugin: &'a str,
    pub function: &'a str,
    pub success: bool,
    pub duration: Duration,
}

impl MetricObservation<'_> {
    pub fn duration_nanos(&self) -> u64 {
        u64::try_from(self.duration.as_nanos()).unwrap_or(u64::MAX)
    }

    /// Label pairs in export order.
    pub fn labels(&self) -> [(&'static str, String); 4] {
        [
            ("chainId", self.chain_id.to_string()),
            ("plugin", self.plugin.to_string()),
            ("function", self.function.to_string()),
            ("success", self.success.to_string()),
        ]
    }
}

/// Sink for observations. Implementations must tolerate concurrent callers.
pub trait DurationHistogram: Send + Sync {
    fn observe(&self, observation: &MetricObservation<'_>);
}

impl<H: DurationHistogram + ?Sized> DurationHistogram for Arc<H> {
    fn observe(&self, observation: &MetricObservation<'_>) {
        (**self).observe(observation)
    }
}

/// Emits to the global `metrics` recorder under the kind's histogram name.
#[derive(Debug, Clone, Copy)]
pub struct ContractHistogram {
    kind: ContractKind,
}

impl ContractHistogram {
    pub fn new(kind: ContractKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }
}

impl DurationHistogram for ContractHistogram {
    fn observe(&self, o: &MetricObservation<'_>) {
        let labels: Vec<Label> = o
            .labels()
            .into_iter()
            .map(|(key, value)| Label::new(key, value))
            .collect();
        metrics::histogram!(self.kind.histogram_name(), labels).record(o.duration.as_secs_f64());
    }
}

/// Register units and help text for every kind. Safe to call more than once.
pub fn describe_contract_histograms() {
    for kind in ContractKind::ALL {
        metrics::describe_histogram!(
            kind.histogram_name(),
            metrics::Unit::Seconds,
            format!("Duration of {} contract read calls", kind)
        );
    }
}
