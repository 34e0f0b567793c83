// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Full mint → wrap → decrypt → unwrap round trips against the in-memory
//! ledger and encryption service

use confidential_bridge::bridge::SessionState;
use confidential_bridge::contracts::AssetLedger;
use confidential_bridge::fhe::CiphertextHandle;
use confidential_bridge::mock::{test_assets, test_config, LedgerOp, MockBridge};
use ethers::types::U256;
use std::time::Duration;

#[tokio::test]
async fn test_mint_wrap_decrypt_unwrap_round_trip() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    let bob = bridge.bob_address();
    let zama = orch.asset("zama").unwrap();

    // Mint 250
    let minted = orch.mint(alice, "zama", U256::from(250u64), None).await.unwrap();
    assert_eq!(minted.state, SessionState::Minted);
    assert_eq!(minted.transactions.len(), 1);
    let balances = minted.balances.expect("refreshed after mint");
    assert_eq!(balances.underlying_balance, U256::from(250u64));
    assert!(balances.confidential_handle.is_zero());

    // Wrap 42: approve then wrap
    let wrapped = orch.wrap(alice, "zama", U256::from(42u64), None).await.unwrap();
    assert_eq!(wrapped.state, SessionState::Wrapped);
    assert_eq!(wrapped.transactions.len(), 2);
    let balances = wrapped.balances.expect("refreshed after wrap");
    assert_eq!(balances.underlying_balance, U256::from(208u64));
    let handle_after_wrap = balances.confidential_handle;
    assert!(!handle_after_wrap.is_zero());
    assert_eq!(bridge.ledger.wrapper_reserve(&zama).await, U256::from(42u64));

    // Decrypt 42
    let decrypted = orch.decrypt_balance(alice, "zama").await.unwrap();
    assert_eq!(decrypted.value, Some(U256::from(42u64)));
    assert_eq!(decrypted.state, SessionState::Decrypted(U256::from(42u64)));

    // Unwrap 5 to bob
    let unwrapped = orch
        .unwrap(alice, "zama", U256::from(5u64), Some(bob))
        .await
        .unwrap();
    assert_eq!(unwrapped.state, SessionState::Wrapped);
    assert_eq!(unwrapped.fulfilled, Some(true));

    // Exactly one oracle request, carrying one handle, raised by the wrapper
    let requests = bridge.ledger.decryption_requests().await;
    assert_eq!(requests.len(), 1);
    let request = unwrapped.oracle_request.expect("correlated request");
    assert_eq!(request, requests[0]);
    assert_eq!(request.handles.len(), 1);
    assert_eq!(request.contract_caller, zama.confidential_address);

    // Alice's handle moved to a fresh non-zero ciphertext
    let handle_after_unwrap = unwrapped.balances.unwrap().confidential_handle;
    assert!(!handle_after_unwrap.is_zero());
    assert_ne!(handle_after_unwrap, handle_after_wrap);

    // Bob received the plain tokens, the wrapper released them
    assert_eq!(bridge.ledger.balance_of(&zama, bob).await.unwrap(), U256::from(5u64));
    assert_eq!(bridge.ledger.wrapper_reserve(&zama).await, U256::from(37u64));

    // Remaining confidential balance decrypts to 37
    let again = orch.decrypt_balance(alice, "zama").await.unwrap();
    assert_eq!(again.value, Some(U256::from(37u64)));
}

#[tokio::test]
async fn test_wrapped_is_reentrant() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();

    orch.mint(alice, "usdc", U256::from(100u64), None).await.unwrap();
    orch.wrap(alice, "usdc", U256::from(10u64), None).await.unwrap();
    orch.wrap(alice, "usdc", U256::from(15u64), None).await.unwrap();
    let outcome = orch.mint(alice, "usdc", U256::from(1u64), None).await.unwrap();
    // minting on top of a confidential balance keeps the session wrapped
    assert_eq!(outcome.state, SessionState::Wrapped);

    let decrypted = orch.decrypt_balance(alice, "usdc").await.unwrap();
    assert_eq!(decrypted.value, Some(U256::from(25u64)));
    assert_eq!(bridge.ledger.submitted(LedgerOp::Wrap).await, 2);
}

#[tokio::test]
async fn test_mint_and_wrap_for_another_holder() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    let bob = bridge.bob_address();
    let eth = orch.asset("eth").unwrap();

    orch.mint(alice, "eth", U256::from(30u64), Some(bob)).await.unwrap();
    assert_eq!(orch.session_state(alice, "eth").await, SessionState::Idle);
    assert_eq!(bridge.ledger.balance_of(&eth, bob).await.unwrap(), U256::from(30u64));

    orch.mint(alice, "eth", U256::from(8u64), None).await.unwrap();
    let outcome = orch.wrap(alice, "eth", U256::from(8u64), Some(bob)).await.unwrap();
    assert_eq!(outcome.state, SessionState::Minted);

    let bob_handle = bridge.ledger.confidential_balance_of(&eth, bob).await.unwrap();
    assert_ne!(bob_handle, CiphertextHandle::ZERO);
    assert_eq!(bridge.store.value_of(bob_handle), Some(8));

    // Bob's own session hydrates from the ledger and can decrypt
    let decrypted = orch.decrypt_balance(bob, "eth").await.unwrap();
    assert_eq!(decrypted.value, Some(U256::from(8u64)));
}

#[tokio::test]
async fn test_oversized_unwrap_burns_nothing() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    let zama = orch.asset("zama").unwrap();

    orch.mint(alice, "zama", U256::from(10u64), None).await.unwrap();
    orch.wrap(alice, "zama", U256::from(10u64), None).await.unwrap();

    // Confidential balances cannot be checked in the clear, so the contract
    // burns zero instead of reverting
    let outcome = orch.unwrap(alice, "zama", U256::from(11u64), None).await.unwrap();
    assert_eq!(outcome.fulfilled, Some(true));
    assert_eq!(bridge.ledger.balance_of(&zama, alice).await.unwrap(), U256::zero());

    let decrypted = orch.decrypt_balance(alice, "zama").await.unwrap();
    assert_eq!(decrypted.value, Some(U256::from(10u64)));
}

#[tokio::test]
async fn test_refresh_reports_wrapped_balance() {
    let bridge = MockBridge::new();
    let alice = bridge.alice_address();

    bridge.orchestrator.mint(alice, "zama", U256::from(5u64), None).await.unwrap();
    bridge.orchestrator.wrap(alice, "zama", U256::from(5u64), None).await.unwrap();

    let snapshot = bridge.orchestrator.refresh_balances(alice, "zama").await.unwrap();
    assert!(!snapshot.never_wrapped());
    assert_eq!(
        bridge.orchestrator.session_state(alice, "zama").await,
        SessionState::Wrapped
    );
}

#[tokio::test]
async fn test_recipient_session_follows_incoming_confidential_balance() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    let bob = bridge.bob_address();

    orch.mint(bob, "zama", U256::from(1u64), None).await.unwrap();
    assert_eq!(orch.session_state(bob, "zama").await, SessionState::Minted);

    orch.mint(alice, "zama", U256::from(10u64), None).await.unwrap();
    orch.wrap(alice, "zama", U256::from(10u64), Some(bob)).await.unwrap();

    // bob's session still reads Minted until his next action re-reads balances
    let outcome = orch.unwrap(bob, "zama", U256::from(3u64), None).await.unwrap();
    assert_eq!(outcome.state, SessionState::Wrapped);
    assert_eq!(outcome.fulfilled, Some(true));

    let zama = orch.asset("zama").unwrap();
    assert_eq!(bridge.ledger.balance_of(&zama, bob).await.unwrap(), U256::from(4u64));
}

#[tokio::test]
async fn test_recipient_session_follows_incoming_mint() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    let bob = bridge.bob_address();

    orch.refresh_balances(bob, "zama").await.unwrap();
    assert_eq!(orch.session_state(bob, "zama").await, SessionState::Idle);

    orch.mint(alice, "zama", U256::from(10u64), Some(bob)).await.unwrap();
    let outcome = orch.wrap(bob, "zama", U256::from(5u64), None).await.unwrap();
    assert_eq!(outcome.state, SessionState::Wrapped);
    assert_eq!(
        outcome.balances.unwrap().underlying_balance,
        U256::from(5u64)
    );
}

#[tokio::test]
async fn test_decrypted_value_dropped_when_handle_moves() {
    let bridge = MockBridge::new();
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    let bob = bridge.bob_address();

    orch.mint(bob, "usdc", U256::from(4u64), None).await.unwrap();
    orch.wrap(bob, "usdc", U256::from(4u64), None).await.unwrap();
    orch.decrypt_balance(bob, "usdc").await.unwrap();

    orch.mint(alice, "usdc", U256::from(6u64), None).await.unwrap();
    assert_eq!(
        orch.session_state(bob, "usdc").await,
        SessionState::Decrypted(U256::from(4u64))
    );
    orch.wrap(alice, "usdc", U256::from(6u64), Some(bob)).await.unwrap();

    // the value read from the old handle no longer describes the balance
    orch.refresh_balances(bob, "usdc").await.unwrap();
    assert_eq!(orch.session_state(bob, "usdc").await, SessionState::Wrapped);

    let decrypted = orch.decrypt_balance(bob, "usdc").await.unwrap();
    assert_eq!(decrypted.value, Some(U256::from(10u64)));
}

#[tokio::test]
async fn test_wrap_sees_tokens_released_out_of_band() {
    let mut config = test_config();
    config.await_fulfillment = false;
    let bridge = MockBridge::with(config, test_assets(), Duration::ZERO);
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();

    orch.mint(alice, "zama", U256::from(10u64), None).await.unwrap();
    orch.wrap(alice, "zama", U256::from(10u64), None).await.unwrap();
    let unwrapped = orch.unwrap(alice, "zama", U256::from(10u64), None).await.unwrap();
    assert_eq!(unwrapped.fulfilled, None);
    assert_eq!(
        unwrapped.balances.unwrap().underlying_balance,
        U256::zero()
    );
    assert_eq!(orch.session(alice, "zama").await.unwrap().unsettled().len(), 1);

    assert_eq!(bridge.ledger.fulfill_pending().await, 1);
    let outcome = orch.wrap(alice, "zama", U256::from(5u64), None).await.unwrap();
    assert_eq!(outcome.state, SessionState::Wrapped);

    // the next action settled the request it found fulfilled
    assert!(orch.session(alice, "zama").await.unwrap().unsettled().is_empty());
}
