//! Version-dispatched dynamic config resolution against an in-memory chain.

mod common;

use alloy::primitives::{Address, Bytes};
use common::{init_tracing, returns, MockChain};
use lane::abi::{common as common_abi, onramp, onramp_v1_0_0, onramp_v1_1_0};
use lane::{ContractVersionResolver, LaneError, OnRamp, RpcError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ONRAMP: Address = Address::new([0x42; 20]);

fn chain_with_version(version: &str) -> Arc<MockChain> {
    let chain = Arc::new(MockChain::new(1337));
    chain.on_call::<common_abi::typeAndVersionCall>(ONRAMP, Ok(returns((version.to_string(),))));
    chain
}

fn handle(chain: &Arc<MockChain>) -> OnRamp {
    OnRamp::bind(ONRAMP, chain.clone())
}

fn v1_0_0_config() -> onramp_v1_0_0::DynamicConfig {
    onramp_v1_0_0::DynamicConfig {
        router: Address::repeat_byte(0x01),
        maxTokensLength: 5,
        destGasOverhead: 350_000,
        destGasPerPayloadByte: 16,
        priceRegistry: Address::repeat_byte(0x02),
        maxDataSize: 30_000,
        maxGasLimit: 2_000_000,
    }
}

#[tokio::test]
async fn v1_0_0_lifts_its_seven_fields() {
    init_tracing();
    let chain = chain_with_version("EVM2EVMOnRamp 1.0.0");
    chain.on_call::<onramp_v1_0_0::getDynamicConfigCall>(ONRAMP, Ok(returns((v1_0_0_config(),))));

    let cfg = ContractVersionResolver::new()
        .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(cfg.router, Address::repeat_byte(0x01));
    assert_eq!(cfg.max_tokens_length, 5);
    assert_eq!(cfg.dest_gas_overhead, 350_000);
    assert_eq!(cfg.dest_gas_per_payload_byte, 16);
    assert_eq!(cfg.price_registry, Address::repeat_byte(0x02));
    assert_eq!(cfg.max_data_size, 30_000);
    assert_eq!(cfg.max_gas_limit, 2_000_000);
    assert_eq!(cfg.dest_data_availability_overhead_gas, 0);
    assert_eq!(cfg.dest_gas_per_data_availability_byte, 0);
    assert_eq!(cfg.dest_data_availability_multiplier_bps, 0);
    assert_eq!(cfg.default_token_fee_usd_cents, 0);
    assert_eq!(cfg.default_token_dest_gas_overhead, 0);
    assert_eq!(cfg.default_token_dest_bytes_overhead, 0);
    assert!(!cfg.enforce_out_of_order);
    assert_eq!(chain.total_calls(), 2);
}

#[tokio::test]
async fn v1_0_0_wire_layout_is_seven_static_words() {
    let chain = chain_with_version("EVM2EVMOnRamp 1.0.0");
    // router, maxTokensLength, destGasOverhead, destGasPerPayloadByte, priceRegistry,
    // maxDataSize, maxGasLimit; each left-padded to one word
    let words: [&[u8]; 7] = [
        &[0x01; 20],
        &5u16.to_be_bytes(),
        &350_000u32.to_be_bytes(),
        &16u16.to_be_bytes(),
        &[0x02; 20],
        &30_000u32.to_be_bytes(),
        &2_000_000u64.to_be_bytes(),
    ];
    let mut encoded = Vec::with_capacity(7 * 32);
    for word in words {
        encoded.extend(std::iter::repeat(0u8).take(32 - word.len()));
        encoded.extend_from_slice(word);
    }
    assert_eq!(returns((v1_0_0_config(),)).as_ref(), encoded.as_slice());
    chain.on_call::<onramp_v1_0_0::getDynamicConfigCall>(ONRAMP, Ok(Bytes::from(encoded)));

    let cfg = ContractVersionResolver::new()
        .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(cfg, lane::resolver::lift_v1_0_0(v1_0_0_config()));
    assert_eq!(cfg.dest_gas_per_payload_byte, 16);
}

#[tokio::test]
async fn v1_1_0_dispatches_to_its_own_binding() {
    let chain = chain_with_version("EVM2EVMOnRamp 1.1.0");
    chain.on_call::<onramp_v1_1_0::getDynamicConfigCall>(
        ONRAMP,
        Ok(returns((onramp_v1_1_0::DynamicConfig {
            router: Address::repeat_byte(0x01),
            maxTokensLength: 1,
            destGasOverhead: 350_000,
            destGasPerPayloadByte: 16,
            priceRegistry: Address::repeat_byte(0x02),
            maxDataSize: 30_000,
            maxGasLimit: 2_000_000,
        },))),
    );

    let cfg = ContractVersionResolver::new()
        .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(cfg.max_tokens_length, 1);
    assert_eq!(cfg.dest_gas_overhead, 350_000);
    assert_eq!(cfg.dest_gas_per_payload_byte, 16);
    assert_eq!(cfg.max_gas_limit, 2_000_000);
    assert_eq!(cfg.dest_data_availability_overhead_gas, 0);
}

#[tokio::test]
async fn current_version_reads_every_field() {
    let chain = chain_with_version("EVM2EVMOnRamp 1.5.0");
    chain.on_call::<onramp::getDynamicConfigCall>(
        ONRAMP,
        Ok(returns((onramp::DynamicConfig {
            router: Address::repeat_byte(0x01),
            maxNumberOfTokensPerMsg: 5,
            destGasOverhead: 350_000,
            destGasPerPayloadByte: 16,
            destDataAvailabilityOverheadGas: 33_596,
            destGasPerDataAvailabilityByte: 16,
            destDataAvailabilityMultiplierBps: 6_840,
            priceRegistry: Address::repeat_byte(0x02),
            maxDataBytes: 30_000,
            maxPerMsgGasLimit: 3_000_000,
            defaultTokenFeeUSDCents: 50,
            defaultTokenDestGasOverhead: 34_000,
            defaultTokenDestBytesOverhead: 32,
            enforceOutOfOrder: true,
        },))),
    );

    let cfg = ContractVersionResolver::new()
        .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(cfg.router, Address::repeat_byte(0x01));
    assert_eq!(cfg.dest_gas_overhead, 350_000);
    assert_eq!(cfg.dest_gas_per_payload_byte, 16);
    assert_eq!(cfg.dest_data_availability_multiplier_bps, 6_840);
    assert_eq!(cfg.max_gas_limit, 3_000_000);
    assert_eq!(cfg.default_token_dest_bytes_overhead, 32);
    assert!(cfg.enforce_out_of_order);
    assert_eq!(chain.total_calls(), 2);
}

#[tokio::test]
async fn pre_release_suffix_is_a_parse_error() {
    let chain = chain_with_version("EVM2EVMOnRamp 1.5.0-dev");
    let err = ContractVersionResolver::new()
        .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LaneError::VersionParse { .. }), "{err:?}");
}

#[tokio::test]
async fn unknown_version_is_unsupported_without_config_call() {
    let chain = chain_with_version("EVM2EVMOnRamp 9.9.9");
    let err = ContractVersionResolver::new()
        .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        LaneError::UnsupportedVersion(raw) => assert!(raw.contains("9.9.9"), "{raw}"),
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
    assert_eq!(chain.calls_to::<onramp::getDynamicConfigCall>(ONRAMP), 0);
}

#[tokio::test]
async fn malformed_type_and_version_is_parse_error() {
    for raw in ["EVM2EVMOnRamp1.2.0", "EVM2EVMOnRamp 1.2", "EVM2EVMOnRamp 01.2.0", ""] {
        let chain = chain_with_version(raw);
        let err = ContractVersionResolver::new()
            .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LaneError::VersionParse { .. }), "{raw:?} gave {err:?}");
        assert_eq!(chain.total_calls(), 1);
    }
}

#[tokio::test]
async fn config_call_failure_keeps_remote_kind_and_cause() {
    let chain = chain_with_version("EVM2EVMOnRamp 1.1.0");
    chain.on_call::<onramp_v1_1_0::getDynamicConfigCall>(ONRAMP, Err("node unavailable".into()));

    let err = ContractVersionResolver::new()
        .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        LaneError::RemoteCall { context, source } => {
            assert!(context.starts_with("dynamic config of EVM2EVMOnRamp 1.1.0"), "{context}");
            assert!(matches!(source, RpcError::Rpc(ref m) if m == "node unavailable"));
        }
        other => panic!("expected RemoteCall, got {other:?}"),
    }
}

#[tokio::test]
async fn type_and_version_failure_is_remote_call() {
    let chain = Arc::new(MockChain::new(1));
    let err = ContractVersionResolver::new()
        .resolve_dynamic_config(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LaneError::RemoteCall { .. }));
}

#[tokio::test]
async fn type_and_version_is_parsed() {
    let chain = chain_with_version("EVM2EVMOnRamp 1.5.0");
    let tv = ContractVersionResolver::new()
        .type_and_version(&handle(&chain), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tv.contract_type, "EVM2EVMOnRamp");
    assert_eq!(tv.to_string(), "EVM2EVMOnRamp 1.5.0");
}

#[tokio::test]
async fn cancelled_before_call_returns_cancelled() {
    let chain = chain_with_version("EVM2EVMOnRamp 1.5.0");
    chain.hang();
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        child.cancel();
    });
    let err = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        ContractVersionResolver::new().resolve_dynamic_config(&handle(&chain), &cancel),
    )
    .await
    .expect("resolver returned after cancellation")
    .unwrap_err();
    assert!(err.is_cancelled());
}
