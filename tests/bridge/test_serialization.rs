// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! One action at a time per (holder, asset) session

use confidential_bridge::bridge::SessionState;
use confidential_bridge::config::BusyPolicy;
use confidential_bridge::error::BridgeError;
use confidential_bridge::mock::{test_assets, test_config, JournalEntry, LedgerOp, MockBridge};
use ethers::types::{Address, U256};
use std::time::Duration;

const CONFIRM_DELAY: Duration = Duration::from_millis(40);

fn slow_bridge(policy: BusyPolicy) -> MockBridge {
    let mut config = test_config();
    config.busy_policy = policy;
    MockBridge::with(config, test_assets(), CONFIRM_DELAY)
}

/// (op, submitted?) per journal entry, for one caller
fn ops_of(journal: &[JournalEntry], caller: Option<Address>) -> Vec<(LedgerOp, bool)> {
    let mut submitted_by = std::collections::HashMap::new();
    journal
        .iter()
        .filter_map(|entry| match entry {
            JournalEntry::Submitted { op, tx_hash, caller: c } => {
                submitted_by.insert(*tx_hash, *c);
                (caller.is_none() || caller == Some(*c)).then_some((*op, true))
            }
            JournalEntry::Confirmed { op, tx_hash } => {
                let c = submitted_by.get(tx_hash).copied();
                (caller.is_none() || caller == c).then_some((*op, false))
            }
        })
        .collect()
}

#[tokio::test]
async fn test_queued_wraps_do_not_interleave() {
    let bridge = slow_bridge(BusyPolicy::Queue);
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    orch.mint(alice, "zama", U256::from(100u64), None).await.unwrap();

    let (first, second) = tokio::join!(
        orch.wrap(alice, "zama", U256::from(30u64), None),
        orch.wrap(alice, "zama", U256::from(20u64), None),
    );
    first.unwrap();
    second.unwrap();

    let journal = bridge.ledger.journal().await;
    let expected = vec![
        (LedgerOp::Mint, true),
        (LedgerOp::Mint, false),
        (LedgerOp::Approve, true),
        (LedgerOp::Approve, false),
        (LedgerOp::Wrap, true),
        (LedgerOp::Wrap, false),
        (LedgerOp::Approve, true),
        (LedgerOp::Approve, false),
        (LedgerOp::Wrap, true),
        (LedgerOp::Wrap, false),
    ];
    assert_eq!(ops_of(&journal, None), expected);

    let decrypted = orch.decrypt_balance(alice, "zama").await.unwrap();
    assert_eq!(decrypted.value, Some(U256::from(50u64)));
}

#[tokio::test]
async fn test_reject_policy_reports_busy_session() {
    let bridge = slow_bridge(BusyPolicy::Reject);
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    orch.mint(alice, "zama", U256::from(10u64), None).await.unwrap();

    let (wrap, rejected) = tokio::join!(
        orch.wrap(alice, "zama", U256::from(10u64), None),
        async {
            tokio::time::sleep(CONFIRM_DELAY / 4).await;
            orch.mint(alice, "zama", U256::from(1u64), None).await
        }
    );
    wrap.unwrap();
    let err = rejected.unwrap_err();
    assert!(matches!(err, BridgeError::SessionBusy { ref asset } if asset == "zama"));
    assert!(err.is_retryable());

    // the rejected mint never reached the ledger
    assert_eq!(bridge.ledger.submitted(LedgerOp::Mint).await, 1);
    assert_eq!(orch.session_state(alice, "zama").await, SessionState::Wrapped);
}

#[tokio::test]
async fn test_sessions_for_different_assets_run_side_by_side() {
    let bridge = slow_bridge(BusyPolicy::Reject);
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();

    let (zama, usdc) = tokio::join!(
        orch.mint(alice, "zama", U256::from(3u64), None),
        orch.mint(alice, "usdc", U256::from(4u64), None),
    );
    assert_eq!(zama.unwrap().state, SessionState::Minted);
    assert_eq!(usdc.unwrap().state, SessionState::Minted);
}

#[tokio::test]
async fn test_sessions_for_different_holders_run_side_by_side() {
    let bridge = slow_bridge(BusyPolicy::Reject);
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    let bob = bridge.bob_address();

    let (a, b) = tokio::join!(
        orch.mint(alice, "eth", U256::from(3u64), None),
        orch.mint(bob, "eth", U256::from(4u64), None),
    );
    a.unwrap();
    b.unwrap();

    let journal = bridge.ledger.journal().await;
    assert_eq!(ops_of(&journal, Some(alice)), vec![(LedgerOp::Mint, true), (LedgerOp::Mint, false)]);
    assert_eq!(ops_of(&journal, Some(bob)), vec![(LedgerOp::Mint, true), (LedgerOp::Mint, false)]);
}

#[tokio::test]
async fn test_state_is_observable_while_action_runs() {
    let bridge = slow_bridge(BusyPolicy::Queue);
    let orch = &bridge.orchestrator;
    let alice = bridge.alice_address();
    orch.mint(alice, "zama", U256::from(10u64), None).await.unwrap();

    let (wrap, during) = tokio::join!(
        orch.wrap(alice, "zama", U256::from(10u64), None),
        async {
            tokio::time::sleep(CONFIRM_DELAY / 4).await;
            (
                orch.session_state(alice, "zama").await,
                orch.session(alice, "zama").await,
            )
        }
    );
    wrap.unwrap();

    let (state, record) = during;
    assert_eq!(state, SessionState::Approving);
    // the full record is held by the running action
    assert!(record.is_none());
    assert!(orch.session(alice, "zama").await.is_some());
}
