// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Asset ledger collaborator
//!
//! The bridge never implements token bookkeeping itself. Everything it needs
//! from the underlying ERC20 and its confidential wrapper goes through
//! [`AssetLedger`]: two reads, four writes that return a transaction hash, a
//! confirmation wait, and a lookup for oracle fulfillment.

use async_trait::async_trait;
use ethers::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

use super::client::Web3Client;
use super::events::{u256_topic, unwrap_finalized_topic};
use super::types::{ConfidentialToken, MintableErc20};
use crate::config::AssetDescriptor;
use crate::error::BridgeError;
use crate::fhe::types::CiphertextHandle;

#[async_trait]
pub trait AssetLedger: Send + Sync {
    /// Plaintext balance of `holder` on the underlying token
    async fn balance_of(
        &self,
        asset: &AssetDescriptor,
        holder: Address,
    ) -> Result<U256, BridgeError>;

    /// Ciphertext handle of `holder`'s confidential balance; zero if never wrapped
    async fn confidential_balance_of(
        &self,
        asset: &AssetDescriptor,
        holder: Address,
    ) -> Result<CiphertextHandle, BridgeError>;

    async fn mint(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<H256, BridgeError>;

    async fn approve(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        spender: Address,
        amount: U256,
    ) -> Result<H256, BridgeError>;

    async fn wrap(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<H256, BridgeError>;

    async fn unwrap(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        from: Address,
        to: Address,
        handle: CiphertextHandle,
        proof: Bytes,
    ) -> Result<H256, BridgeError>;

    /// Wait until the transaction is mined; reverted transactions are errors
    async fn confirm(&self, tx_hash: H256) -> Result<TransactionReceipt, BridgeError>;

    /// Whether the oracle callback for `request_id` has settled on-chain
    async fn unwrap_finalized(
        &self,
        asset: &AssetDescriptor,
        request_id: U256,
        since_block: u64,
    ) -> Result<bool, BridgeError>;
}

/// [`AssetLedger`] backed by a JSON-RPC node
pub struct EthersLedger {
    client: Arc<Web3Client>,
}

impl EthersLedger {
    pub fn new(client: Arc<Web3Client>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<Web3Client> {
        &self.client
    }

    fn ensure_configured(asset: &AssetDescriptor) -> Result<(), BridgeError> {
        if asset.is_configured() {
            Ok(())
        } else {
            Err(BridgeError::ContractsNotConfigured(asset.key.clone()))
        }
    }

    /// Signing client for `caller`; the bound wallet is the only account
    /// this ledger can send from
    fn signer_for(&self, caller: Address) -> Result<Arc<super::client::SignerClient>, BridgeError> {
        let signer = self.client.signer()?;
        if signer.address() != caller {
            return Err(BridgeError::SignerUnavailable);
        }
        Ok(signer)
    }
}

#[async_trait]
impl AssetLedger for EthersLedger {
    async fn balance_of(
        &self,
        asset: &AssetDescriptor,
        holder: Address,
    ) -> Result<U256, BridgeError> {
        Self::ensure_configured(asset)?;
        let token = MintableErc20::new(asset.underlying_address, self.client.provider.clone());
        Ok(token.balance_of(holder).call().await?)
    }

    async fn confidential_balance_of(
        &self,
        asset: &AssetDescriptor,
        holder: Address,
    ) -> Result<CiphertextHandle, BridgeError> {
        Self::ensure_configured(asset)?;
        let token =
            ConfidentialToken::new(asset.confidential_address, self.client.provider.clone());
        let raw: [u8; 32] = token.confidential_balance_of(holder).call().await?;
        Ok(CiphertextHandle(raw))
    }

    async fn mint(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<H256, BridgeError> {
        Self::ensure_configured(asset)?;
        let token = MintableErc20::new(asset.underlying_address, self.signer_for(caller)?);
        let call = token.mint(to, amount);
        let pending = call.send().await?;
        let tx_hash = pending.tx_hash();
        info!("📤 mint {} {} to {:?}: {:?}", amount, asset.symbol, to, tx_hash);
        Ok(tx_hash)
    }

    async fn approve(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        spender: Address,
        amount: U256,
    ) -> Result<H256, BridgeError> {
        Self::ensure_configured(asset)?;
        let token = MintableErc20::new(asset.underlying_address, self.signer_for(caller)?);
        let call = token.approve(spender, amount);
        let pending = call.send().await?;
        let tx_hash = pending.tx_hash();
        info!("📤 approve {} {} for {:?}: {:?}", amount, asset.symbol, spender, tx_hash);
        Ok(tx_hash)
    }

    async fn wrap(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<H256, BridgeError> {
        Self::ensure_configured(asset)?;
        let token = ConfidentialToken::new(asset.confidential_address, self.signer_for(caller)?);
        let call = token.wrap(to, amount);
        let pending = call.send().await?;
        let tx_hash = pending.tx_hash();
        info!("📤 wrap {} {} to {:?}: {:?}", amount, asset.symbol, to, tx_hash);
        Ok(tx_hash)
    }

    async fn unwrap(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        from: Address,
        to: Address,
        handle: CiphertextHandle,
        proof: Bytes,
    ) -> Result<H256, BridgeError> {
        Self::ensure_configured(asset)?;
        let token = ConfidentialToken::new(asset.confidential_address, self.signer_for(caller)?);
        let call = token.unwrap(from, to, handle.0, proof);
        let pending = call.send().await?;
        let tx_hash = pending.tx_hash();
        info!("📤 unwrap {} from {:?} to {:?}: {:?}", asset.symbol, from, to, tx_hash);
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: H256) -> Result<TransactionReceipt, BridgeError> {
        self.client.wait_for_confirmation(tx_hash).await
    }

    async fn unwrap_finalized(
        &self,
        asset: &AssetDescriptor,
        request_id: U256,
        since_block: u64,
    ) -> Result<bool, BridgeError> {
        Self::ensure_configured(asset)?;
        let filter = Filter::new()
            .address(asset.confidential_address)
            .topic0(unwrap_finalized_topic())
            .topic1(u256_topic(request_id))
            .from_block(since_block);
        let logs = self.client.get_logs(&filter).await?;
        debug!(
            "UnwrapFinalized lookup for request {} on {}: {} log(s)",
            request_id,
            asset.symbol,
            logs.len()
        );
        Ok(!logs.is_empty())
    }
}
