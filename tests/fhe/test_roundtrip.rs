// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypt → store on the ledger → resolve yields the original value

use super::harness::Harness;
use confidential_bridge::contracts::AssetLedger;
use confidential_bridge::fhe::CiphertextHandle;
use ethers::types::U256;

#[tokio::test]
async fn test_wrapped_balance_resolves_to_amount() {
    let h = Harness::new();
    let zama = h.asset("zama");
    let handle = h.wrap(&zama, U256::from(42u64)).await;

    let (authorization, keypair) = h.authorize(&[zama.confidential_address], 7).await;
    let values = h
        .oracle
        .resolve(&[handle], zama.confidential_address, &authorization, keypair)
        .await
        .unwrap();
    assert_eq!(values[&handle], U256::from(42u64));
    assert_eq!(h.service.resolve_calls(), 1);
}

#[tokio::test]
async fn test_u64_boundaries_survive_round_trip() {
    for amount in [1u64, u64::MAX] {
        let h = Harness::new();
        let usdc = h.asset("usdc");
        let handle = h.wrap(&usdc, U256::from(amount)).await;

        let (authorization, keypair) = h.authorize(&[usdc.confidential_address], 1).await;
        let values = h
            .oracle
            .resolve(&[handle], usdc.confidential_address, &authorization, keypair)
            .await
            .unwrap();
        assert_eq!(values[&handle], U256::from(amount), "amount {}", amount);
    }
}

#[tokio::test]
async fn test_encrypted_input_value_is_what_was_added() {
    let h = Harness::new();
    let eth = h.asset("eth");

    let mut builder = h
        .encryption
        .create_input(eth.confidential_address, h.holder_address())
        .unwrap();
    builder.add_uint64(U256::from(u64::MAX)).unwrap();
    let input = builder.encrypt().await.unwrap();

    let handle = input.first_handle().unwrap();
    assert_eq!(h.store.value_of(handle), Some(u64::MAX));
    assert_eq!(h.store.contract_of(handle), Some(eth.confidential_address));
}

#[tokio::test]
async fn test_zero_handles_resolve_without_oracle() {
    let h = Harness::new();
    let zama = h.asset("zama");

    let (authorization, keypair) = h.authorize(&[zama.confidential_address], 1).await;
    let values = h
        .oracle
        .resolve(
            &[CiphertextHandle::ZERO],
            zama.confidential_address,
            &authorization,
            keypair,
        )
        .await
        .unwrap();
    assert_eq!(values[&CiphertextHandle::ZERO], U256::zero());
    assert_eq!(h.service.resolve_calls(), 0);
}

#[tokio::test]
async fn test_mixed_zero_and_real_handles() {
    let h = Harness::new();
    let zama = h.asset("zama");
    let handle = h.wrap(&zama, U256::from(9u64)).await;

    let (authorization, keypair) = h.authorize(&[zama.confidential_address], 1).await;
    let values = h
        .oracle
        .resolve(
            &[CiphertextHandle::ZERO, handle],
            zama.confidential_address,
            &authorization,
            keypair,
        )
        .await
        .unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[&handle], U256::from(9u64));
    assert_eq!(values[&CiphertextHandle::ZERO], U256::zero());
}

#[tokio::test]
async fn test_each_wrap_produces_new_handle() {
    let h = Harness::new();
    let zama = h.asset("zama");
    let first = h.wrap(&zama, U256::from(5u64)).await;
    let second = h.wrap(&zama, U256::from(5u64)).await;
    assert_ne!(first, second);

    let holder = h.holder_address();
    assert_eq!(h.ledger.confidential_balance_of(&zama, holder).await.unwrap(), second);
    assert_eq!(h.store.value_of(second), Some(10));
}
