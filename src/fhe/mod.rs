// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Homomorphic-encryption client side
//!
//! The bridge never encrypts or decrypts on its own. It talks to an
//! [`EncryptionService`] (the relayer in production, an in-memory double in
//! tests) through three components:
//!
//! - [`EncryptionClient`] builds encrypted inputs bound to (contract, account)
//! - [`AuthorizationSigner`] produces signed user-decryption authorizations
//! - [`DecryptionOracleClient`] submits unwraps, correlates oracle requests
//!   and resolves handles to cleartext

pub mod authorization;
pub mod input;
pub mod oracle;
pub mod relayer;
pub mod types;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::HashMap;

use crate::error::BridgeError;

pub use authorization::{
    AccountSigner, AuthorizationDomain, AuthorizationPayload, AuthorizationSigner,
    DecryptionAuthorization, EphemeralKeypair, WalletSigner,
};
pub use input::{EncryptionClient, InputBuilder};
pub use oracle::DecryptionOracleClient;
pub use relayer::{RelayerConfig, RelayerService};
pub use types::{CiphertextHandle, EncryptedInput, InputBinding};

/// Capability interface over the encryption backend
#[async_trait]
pub trait EncryptionService: Send + Sync {
    /// Key material loaded and backend reachable
    fn is_ready(&self) -> bool;

    /// EIP-712 domain decryption authorizations are signed under
    fn domain(&self) -> AuthorizationDomain;

    /// Encrypt `values` for `binding`: one handle per value, one proof for all
    async fn encrypt(
        &self,
        binding: InputBinding,
        values: &[u64],
    ) -> Result<EncryptedInput, BridgeError>;

    fn generate_keypair(&self) -> EphemeralKeypair {
        EphemeralKeypair::generate()
    }

    fn build_authorization(
        &self,
        public_key: &[u8],
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> AuthorizationPayload {
        AuthorizationPayload::new(
            self.domain(),
            public_key,
            contract_addresses,
            start_timestamp,
            duration_days,
        )
    }

    /// Re-encrypt `handles` to the authorization's public key and open the
    /// results with `keypair`
    async fn resolve(
        &self,
        handles: &[CiphertextHandle],
        authorization: &DecryptionAuthorization,
        keypair: &EphemeralKeypair,
    ) -> Result<HashMap<CiphertextHandle, U256>, BridgeError>;
}
