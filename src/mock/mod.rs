// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process doubles for the ledger, the encryption service and the holder's
//! signer, plus [`MockBridge`] which wires them into an orchestrator

pub mod fhe;
pub mod ledger;
pub mod signer;

use ethers::types::Address;
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::{BridgeOrchestrator, LocalSignerProvider};
use crate::config::{AssetDescriptor, AssetRegistry, BridgeConfig, TimeoutConfig};
use crate::fhe::{AccountSigner, AuthorizationDomain};

pub use fhe::{CiphertextStore, MockEncryptionService};
pub use ledger::{InMemoryLedger, InjectedFailure, JournalEntry, LedgerOp};
pub use signer::{ManualClock, MockSigner};

/// Unix time mock clocks start at
pub const MOCK_EPOCH: u64 = 1_700_000_000;

/// zama/usdc/eth at fixed addresses, zero decimals so amounts read as-is
pub fn test_assets() -> AssetRegistry {
    let assets = [("zama", "ZAMA", 0x10), ("usdc", "USDC", 0x20), ("eth", "ETH", 0x30)]
        .into_iter()
        .map(|(key, symbol, base)| AssetDescriptor {
            key: key.to_string(),
            label: format!("{} Test Token", symbol),
            symbol: symbol.to_string(),
            decimals: 0,
            underlying_address: Address::from_low_u64_be(base),
            confidential_address: Address::from_low_u64_be(base + 1),
        })
        .collect();
    AssetRegistry::new(assets)
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        chain_id: 31337,
        decryption_contract: Address::repeat_byte(0xdc),
        poll_interval_ms: 10,
        timeouts: TimeoutConfig {
            ledger_call_secs: 5,
            confirmation_secs: 10,
            encryption_secs: 5,
            signer_secs: 10,
            oracle_secs: 10,
            fulfillment_secs: 10,
        },
        ..BridgeConfig::default()
    }
}

pub struct MockBridge {
    pub orchestrator: BridgeOrchestrator,
    pub ledger: Arc<InMemoryLedger>,
    pub service: Arc<MockEncryptionService>,
    pub store: Arc<CiphertextStore>,
    pub alice: Arc<MockSigner>,
    pub bob: Arc<MockSigner>,
    pub clock: Arc<ManualClock>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self::with(test_config(), test_assets(), Duration::ZERO)
    }

    pub fn with(config: BridgeConfig, assets: AssetRegistry, confirm_delay: Duration) -> Self {
        let store = Arc::new(CiphertextStore::new());
        let ledger = Arc::new(InMemoryLedger::new(store.clone()).with_confirm_delay(confirm_delay));
        let service = Arc::new(MockEncryptionService::new(
            store.clone(),
            AuthorizationDomain::new(config.chain_id, config.decryption_contract),
        ));
        let alice = Arc::new(MockSigner::random());
        let bob = Arc::new(MockSigner::random());
        let clock = Arc::new(ManualClock::new(MOCK_EPOCH));

        let signers = LocalSignerProvider::new()
            .with_signer(alice.clone())
            .with_signer(bob.clone());
        let orchestrator = BridgeOrchestrator::new(
            config,
            assets,
            ledger.clone(),
            service.clone(),
            Arc::new(signers),
            clock.clone(),
        );

        Self {
            orchestrator,
            ledger,
            service,
            store,
            alice,
            bob,
            clock,
        }
    }

    pub fn alice_address(&self) -> Address {
        self.alice.address()
    }

    pub fn bob_address(&self) -> Address {
        self.bob.address()
    }
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}
