//! Process-wide tracing subscriber and Prometheus recorder.
//!
//! Both are installed at most once per process. The first successful [init_telemetry] wins;
//! later calls return a guard over the same recorder and ignore their config.

use crate::histogram::describe_contract_histograms;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

static TRACING_INSTALLED: OnceCell<()> = OnceCell::new();
static RECORDER: OnceCell<Arc<PrometheusHandle>> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    log_filter: String,
    metrics_address: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            metrics_address: None,
        }
    }
}

impl TelemetryConfig {
    /// `<PREFIX>_LOG_FILTER` (default `info`) and `<PREFIX>_METRICS_ADDRESS` (unset or blank
    /// means no HTTP listener).
    pub fn from_env(prefix: &str) -> Self {
        let var = |suffix: &str| {
            env::var(format!("{}_{suffix}", prefix.trim().to_ascii_uppercase()))
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            log_filter: var("LOG_FILTER").unwrap_or_else(|| "info".to_string()),
            metrics_address: var("METRICS_ADDRESS"),
        }
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn with_metrics_address(mut self, addr: impl Into<String>) -> Self {
        self.metrics_address = Some(addr.into());
        self
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn metrics_address(&self) -> Option<&str> {
        self.metrics_address.as_deref()
    }
}

/// Handle to the installed recorder.
#[derive(Clone)]
pub struct TelemetryGuard {
    metrics: Arc<PrometheusHandle>,
}

impl TelemetryGuard {
    /// Current Prometheus text exposition.
    pub fn render_metrics(&self) -> String {
        self.metrics.render()
    }
}

/// Install the subscriber and the recorder, then describe the contract histograms.
///
/// With a metrics address the scrape listener is spawned on the current tokio runtime, so
/// that form must be called from inside one.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_tracing(config.log_filter())?;
    let metrics = RECORDER
        .get_or_try_init(|| install_recorder(config.metrics_address()))?
        .clone();
    describe_contract_histograms();
    Ok(TelemetryGuard { metrics })
}

fn init_tracing(filter: &str) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(filter).map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;
    if TRACING_INSTALLED.get().is_some() {
        return Ok(());
    }
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
    {
        Ok(()) => {
            let _ = TRACING_INSTALLED.set(());
            Ok(())
        }
        // lost a race against a concurrent init_telemetry
        Err(_) if TRACING_INSTALLED.get().is_some() => Ok(()),
        Err(err) => Err(TelemetryError::Tracing(err.to_string())),
    }
}

fn install_recorder(address: Option<&str>) -> Result<Arc<PrometheusHandle>, TelemetryError> {
    let builder = PrometheusBuilder::new();
    let Some(address) = address else {
        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder)
            .map_err(|err| TelemetryError::Metrics(err.to_string()))?;
        return Ok(Arc::new(handle));
    };

    let socket: SocketAddr = address.parse().map_err(|err: std::net::AddrParseError| {
        TelemetryError::InvalidMetricsAddress(address.to_string(), err.to_string())
    })?;
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|_| TelemetryError::NoRuntime(address.to_string()))?;
    let (recorder, exporter) = {
        let _entered = runtime.enter();
        builder
            .with_http_listener(socket)
            .build()
            .map_err(|err| TelemetryError::Metrics(err.to_string()))?
    };
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|err| TelemetryError::Metrics(err.to_string()))?;
    runtime.spawn(async move {
        if let Err(err) = exporter.await {
            tracing::error!(?err, "metrics listener stopped");
        }
    });
    tracing::info!(%socket, "serving metrics");
    Ok(Arc::new(handle))
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("invalid metrics address `{0}`: {1}")]
    InvalidMetricsAddress(String, String),
    #[error("metrics listener on `{0}` needs a running tokio runtime")]
    NoRuntime(String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{ContractKind, MetricObservation};
    use std::io::{Read, Write};
    use std::sync::Mutex;
    use std::time::Duration;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_when_unset() {
        let _guard = ENV_GUARD.lock().unwrap();
        env::remove_var("LANE_LOG_FILTER");
        env::remove_var("LANE_METRICS_ADDRESS");
        let cfg = TelemetryConfig::from_env("lane");
        assert_eq!(cfg, TelemetryConfig::default());
    }

    #[test]
    fn reads_prefixed_vars() {
        let _guard = ENV_GUARD.lock().unwrap();
        env::set_var("LANE_LOG_FILTER", "lane=debug");
        env::set_var("LANE_METRICS_ADDRESS", " 127.0.0.1:9464 ");
        let cfg = TelemetryConfig::from_env("LANE");
        assert_eq!(cfg.log_filter(), "lane=debug");
        assert_eq!(cfg.metrics_address(), Some("127.0.0.1:9464"));
        env::remove_var("LANE_LOG_FILTER");
        env::remove_var("LANE_METRICS_ADDRESS");
    }

    #[test]
    fn bad_metrics_address_fails_before_install() {
        let err = install_recorder(Some("not-an-addr")).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidMetricsAddress(ref a, _) if a == "not-an-addr"));
    }

    #[test]
    fn listener_outside_runtime_is_an_error() {
        let err = install_recorder(Some("127.0.0.1:9464")).unwrap_err();
        assert!(matches!(err, TelemetryError::NoRuntime(_)));
    }

    #[test]
    fn invalid_filter_is_rejected() {
        assert!(matches!(init_tracing("lane=[["), Err(TelemetryError::InvalidLogFilter(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn metrics_listener_serves_scrapes() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let addr = format!("127.0.0.1:{port}");
        let guard = init_telemetry(
            &TelemetryConfig::default()
                .with_log_filter("warn")
                .with_metrics_address(addr.clone()),
        )
        .unwrap();
        ContractKind::OnRamp.histogram().observe(&MetricObservation {
            chain_id: 1,
            plugin: "commit",
            function: "GetDynamicConfig",
            success: true,
            duration: Duration::from_millis(2),
        });

        let response = tokio::task::spawn_blocking(move || {
            let mut stream = std::net::TcpStream::connect(&addr).unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            stream
                .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        })
        .await
        .unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains(ContractKind::OnRamp.histogram_name()), "{response}");
        assert!(guard
            .render_metrics()
            .contains(ContractKind::OnRamp.histogram_name()));
    }
}
