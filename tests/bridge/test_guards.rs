// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Guards reject bad requests before any external write

use confidential_bridge::bridge::SessionState;
use confidential_bridge::config::{AssetDescriptor, AssetRegistry};
use confidential_bridge::error::{BridgeError, ErrorCategory};
use confidential_bridge::mock::{test_config, MockBridge};
use ethers::types::{Address, U256};
use std::time::Duration;

fn above_u64() -> U256 {
    U256::from(u64::MAX) + 1
}

#[tokio::test]
async fn test_unwrap_above_u64_rejected_before_submission() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();

    orch.mint(alice, "zama", U256::from(50u64), None).await.unwrap();
    orch.wrap(alice, "zama", U256::from(50u64), None).await.unwrap();
    let submissions = bridge.ledger.submissions().await;

    let err = orch.unwrap(alice, "zama", above_u64(), None).await.unwrap_err();
    assert!(matches!(err, BridgeError::AmountOutOfRange { bits: 64, .. }));
    assert_eq!(err.category(), ErrorCategory::Validation);

    assert_eq!(bridge.ledger.submissions().await, submissions);
    assert_eq!(bridge.service.encrypt_calls(), 0);
    assert_eq!(orch.session_state(alice, "zama").await, SessionState::Wrapped);
}

#[tokio::test]
async fn test_wrap_above_u64_rejected_before_submission() {
    let bridge = MockBridge::new();
    let alice = bridge.alice_address();

    let err = bridge
        .orchestrator
        .wrap(alice, "zama", above_u64(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::AmountOutOfRange { .. }));
    assert_eq!(bridge.ledger.submissions().await, 0);
}

#[tokio::test]
async fn test_zero_amounts_rejected() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();

    for result in [
        orch.mint(alice, "zama", U256::zero(), None).await,
        orch.wrap(alice, "zama", U256::zero(), None).await,
        orch.unwrap(alice, "zama", U256::zero(), None).await,
    ] {
        assert!(matches!(result, Err(BridgeError::InvalidAmount(_))));
    }
    assert_eq!(bridge.ledger.submissions().await, 0);
    assert_eq!(orch.session_state(alice, "zama").await, SessionState::Idle);
}

#[tokio::test]
async fn test_wrap_more_than_underlying_balance() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();

    orch.mint(alice, "zama", U256::from(10u64), None).await.unwrap();
    let err = orch.wrap(alice, "zama", U256::from(11u64), None).await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::InsufficientBalance { required, available }
            if required == U256::from(11u64) && available == U256::from(10u64)
    ));
    // only the mint was ever submitted
    assert_eq!(bridge.ledger.submissions().await, 1);
    assert_eq!(orch.session_state(alice, "zama").await, SessionState::Minted);
}

#[tokio::test]
async fn test_actions_out_of_order() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();

    let err = orch.wrap(alice, "zama", U256::from(1u64), None).await.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidState { action: "wrap", .. }));

    orch.mint(alice, "zama", U256::from(1u64), None).await.unwrap();
    let err = orch.unwrap(alice, "zama", U256::from(1u64), None).await.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidState { action: "unwrap", .. }));
    assert_eq!(bridge.service.encrypt_calls(), 0);
}

#[tokio::test]
async fn test_unknown_and_unconfigured_assets() {
    let mut assets: Vec<AssetDescriptor> = confidential_bridge::mock::test_assets()
        .iter()
        .map(|a| a.as_ref().clone())
        .collect();
    assets.push(AssetDescriptor {
        key: "dai".to_string(),
        label: "DAI Test Token".to_string(),
        symbol: "DAI".to_string(),
        decimals: 0,
        underlying_address: Address::from_low_u64_be(0x40),
        confidential_address: Address::zero(),
    });
    let bridge = MockBridge::with(test_config(), AssetRegistry::new(assets), Duration::ZERO);
    let alice = bridge.alice_address();

    let err = bridge
        .orchestrator
        .mint(alice, "doge", U256::from(1u64), None)
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnknownAsset(ref key) if key == "doge"));

    let err = bridge
        .orchestrator
        .mint(alice, "DAI", U256::from(1u64), None)
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::ContractsNotConfigured(ref key) if key == "dai"));
    assert_eq!(err.category(), ErrorCategory::Connectivity);
    assert_eq!(bridge.ledger.submissions().await, 0);
}

#[tokio::test]
async fn test_holder_without_signer() {
    let bridge = MockBridge::new();
    let stranger = Address::from_low_u64_be(0x5eed);

    let err = bridge
        .orchestrator
        .mint(stranger, "zama", U256::from(1u64), None)
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::SignerUnavailable));
    assert!(err.is_retryable());

    let err = bridge
        .orchestrator
        .decrypt_balance(stranger, "zama")
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::SignerUnavailable));
    assert_eq!(bridge.ledger.submissions().await, 0);
}

#[tokio::test]
async fn test_unwrap_while_service_initializing() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();

    orch.mint(alice, "zama", U256::from(9u64), None).await.unwrap();
    orch.wrap(alice, "zama", U256::from(9u64), None).await.unwrap();
    let submissions = bridge.ledger.submissions().await;

    bridge.service.set_ready(false);
    let err = orch.unwrap(alice, "zama", U256::from(1u64), None).await.unwrap_err();
    assert!(matches!(err, BridgeError::ServiceUnavailable));
    assert_eq!(bridge.ledger.submissions().await, submissions);

    bridge.service.set_ready(true);
    orch.unwrap(alice, "zama", U256::from(1u64), None).await.unwrap();
}
