// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory ledger, encryption service and oracle client wired together

use confidential_bridge::config::AssetDescriptor;
use confidential_bridge::contracts::AssetLedger;
use confidential_bridge::fhe::{
    AccountSigner, AuthorizationDomain, AuthorizationSigner, DecryptionAuthorization,
    DecryptionOracleClient, EncryptionClient, EphemeralKeypair,
};
use confidential_bridge::fhe::CiphertextHandle;
use confidential_bridge::mock::{
    test_assets, CiphertextStore, InMemoryLedger, ManualClock, MockEncryptionService, MockSigner,
    MOCK_EPOCH,
};
use confidential_bridge::utils::Clock;
use ethers::types::{Address, U256};
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub store: Arc<CiphertextStore>,
    pub ledger: Arc<InMemoryLedger>,
    pub service: Arc<MockEncryptionService>,
    pub clock: Arc<ManualClock>,
    pub oracle: DecryptionOracleClient,
    pub encryption: EncryptionClient,
    pub authorizer: AuthorizationSigner,
    pub holder: MockSigner,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(CiphertextStore::new());
        let ledger = Arc::new(InMemoryLedger::new(store.clone()));
        let service = Arc::new(MockEncryptionService::new(
            store.clone(),
            AuthorizationDomain::new(31337, Address::repeat_byte(0xdc)),
        ));
        let clock = Arc::new(ManualClock::new(MOCK_EPOCH));
        let oracle = DecryptionOracleClient::new(
            ledger.clone(),
            service.clone(),
            clock.clone(),
            Duration::from_millis(10),
        );

        Self {
            encryption: EncryptionClient::new(service.clone()),
            authorizer: AuthorizationSigner::new(service.clone()),
            store,
            ledger,
            service,
            clock,
            oracle,
            holder: MockSigner::random(),
        }
    }

    pub fn asset(&self, key: &str) -> Arc<AssetDescriptor> {
        test_assets().resolve(key).unwrap()
    }

    pub fn holder_address(&self) -> Address {
        self.holder.address()
    }

    /// Mint, approve and wrap `amount` for the holder; returns the new
    /// balance handle
    pub async fn wrap(&self, asset: &AssetDescriptor, amount: U256) -> CiphertextHandle {
        let holder = self.holder_address();
        self.ledger.mint(asset, holder, holder, amount).await.unwrap();
        self.ledger
            .approve(asset, holder, asset.confidential_address, amount)
            .await
            .unwrap();
        self.ledger.wrap(asset, holder, holder, amount).await.unwrap();
        self.ledger.confidential_balance_of(asset, holder).await.unwrap()
    }

    /// Fresh keypair plus a signed authorization starting now
    pub async fn authorize(
        &self,
        contracts: &[Address],
        duration_days: u64,
    ) -> (DecryptionAuthorization, EphemeralKeypair) {
        let keypair = self.authorizer.generate_keypair();
        let payload = self.authorizer.build_authorization(
            keypair.public_key(),
            contracts,
            self.clock.now(),
            duration_days,
        );
        let authorization = self
            .authorizer
            .sign(payload, Some(&self.holder as &dyn AccountSigner))
            .await
            .unwrap();
        (authorization, keypair)
    }
}
