//! Example: follow an off-ramp's execution events behind a confirmation depth.
//!
//! Reads the chain connection from `LANE_HTTP_URL` / `LANE_CHAIN_ID` (plus optional
//! `LANE_START_BLOCK`, `LANE_GETLOGS_MAX_RANGE`, `LANE_LOG_FILTER`, `LANE_METRICS_ADDRESS`) and
//! prints one-line JSON per confirmed `ExecutionStateChanged` event.
//!
//! Usage:
//!
//!   cargo run -p lane --example lane_tail -- --offramp <OFFRAMP_ADDRESS> [--onramp <ONRAMP_ADDRESS>]
//!
//! Options:
//!   --depth <K>      Confirmation depth. Default: 6.
//!   --finalized      Bound by the latest finalized block instead of a depth.
//!   --interval <S>   Poll interval in seconds. Default: 5.

use alloy::primitives::Address;
use anyhow::Context;
use lane::abi::offramp;
use lane::{
    init_telemetry, ClientConfig, ConfirmationPolicy, ContractVersionResolver, EventQueryClient,
    OnRamp, TelemetryConfig,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const USAGE: &str = "Usage: lane_tail --offramp <OFFRAMP_ADDRESS> [--onramp <ONRAMP_ADDRESS>] [--depth K] [--finalized] [--interval S]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let telemetry = init_telemetry(&TelemetryConfig::from_env("LANE"))?;
    let args: Vec<String> = std::env::args().collect();
    let mut offramp_addr = String::new();
    let mut onramp_addr = String::new();
    let mut depth: u64 = 6;
    let mut finalized = false;
    let mut interval = 5u64;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--offramp" => {
                i += 1;
                offramp_addr = args.get(i).cloned().unwrap_or_default();
            }
            "--onramp" => {
                i += 1;
                onramp_addr = args.get(i).cloned().unwrap_or_default();
            }
            "--depth" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    depth = s.parse().unwrap_or(6);
                }
            }
            "--finalized" => finalized = true,
            "--interval" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    interval = s.parse().unwrap_or(5);
                }
            }
            "--help" | "-h" => {
                eprintln!("{USAGE}");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }
    if offramp_addr.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let offramp = Address::from_str(&offramp_addr).context("parse --offramp")?;

    let config = ClientConfig::from_env("LANE")?;
    let client = Arc::new(config.http_client()?);
    let events = EventQueryClient::from_config(&config, client.clone(), client.clone());
    let cancel = CancellationToken::new();

    if !onramp_addr.is_empty() {
        let onramp = OnRamp::bind(
            Address::from_str(&onramp_addr).context("parse --onramp")?,
            client.clone(),
        );
        let cfg = ContractVersionResolver::new()
            .resolve_dynamic_config(&onramp, &cancel)
            .await?;
        tracing::info!(?cfg, "on-ramp dynamic config");
    }

    let policy = if finalized {
        ConfirmationPolicy::Finalized
    } else {
        ConfirmationPolicy::Depth(depth)
    };
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown.cancel();
    });

    let mut next_seq = 0u64;
    loop {
        match events
            .events_with_seq_num_gte::<offramp::ExecutionStateChanged>(offramp, next_seq, policy, &cancel)
            .await
        {
            Ok(batch) => {
                for e in batch {
                    let json = serde_json::json!({
                        "seq": e.data.sequenceNumber,
                        "message_id": format!("{:#x}", e.data.messageId),
                        "state": e.data.state,
                        "block": e.meta.block_number,
                        "timestamp": e.meta.block_timestamp,
                        "tx": format!("{:#x}", e.meta.tx_hash),
                    });
                    println!("{}", json);
                    next_seq = e.data.sequenceNumber + 1;
                }
            }
            Err(e) if e.is_cancelled() => break,
            Err(e) => tracing::warn!(%e, "event query failed"),
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
        }
    }
    tracing::debug!(metrics = %telemetry.render_metrics(), "final metrics");
    Ok(())
}
