// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::signers::LocalWallet;
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BridgeError;
use crate::fhe::{AccountSigner, WalletSigner};

/// Hands out the signing capability for a holder, if one is bound
pub trait SignerProvider: Send + Sync {
    /// Holder used when a command does not name one
    fn default_account(&self) -> Option<Address>;

    fn signer_for(&self, account: Address) -> Result<Arc<dyn AccountSigner>, BridgeError>;
}

/// Fixed set of signers known up front
#[derive(Default, Clone)]
pub struct LocalSignerProvider {
    signers: HashMap<Address, Arc<dyn AccountSigner>>,
    default_account: Option<Address>,
}

impl LocalSignerProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_wallet(wallet: LocalWallet) -> Self {
        Self::new().with_signer(Arc::new(WalletSigner::new(wallet)))
    }

    /// The first signer added becomes the default account
    pub fn with_signer(mut self, signer: Arc<dyn AccountSigner>) -> Self {
        let address = signer.address();
        self.default_account.get_or_insert(address);
        self.signers.insert(address, signer);
        self
    }

    pub fn accounts(&self) -> Vec<Address> {
        let mut accounts: Vec<Address> = self.signers.keys().copied().collect();
        accounts.sort();
        accounts
    }
}

impl SignerProvider for LocalSignerProvider {
    fn default_account(&self) -> Option<Address> {
        self.default_account
    }

    fn signer_for(&self, account: Address) -> Result<Arc<dyn AccountSigner>, BridgeError> {
        self.signers
            .get(&account)
            .cloned()
            .ok_or(BridgeError::SignerUnavailable)
    }
}
