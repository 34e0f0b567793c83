// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

pub type SignerClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

#[derive(Debug, Clone)]
pub struct Web3Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub confirmations: usize,
    pub polling_interval: Duration,
    pub private_key: Option<String>,
}

impl Default for Web3Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            confirmations: 1,
            polling_interval: Duration::from_millis(100),
            private_key: None,
        }
    }
}

impl Web3Config {
    pub fn from_bridge(config: &BridgeConfig, private_key: Option<String>) -> Self {
        Self {
            rpc_url: config.rpc_url.clone(),
            chain_id: config.chain_id,
            confirmations: config.confirmations.max(1),
            polling_interval: config.poll_interval(),
            private_key,
        }
    }
}

/// JSON-RPC provider plus the optional wallet that signs bridge transactions
pub struct Web3Client {
    pub provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
    config: Web3Config,
}

impl Web3Client {
    pub async fn new(config: Web3Config) -> Result<Self, BridgeError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| BridgeError::ProviderError(format!("Failed to create provider: {}", e)))?
            .interval(config.polling_interval);

        // Verify connection
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| BridgeError::ProviderError(format!("Failed to connect to RPC: {}", e)))?;

        if chain_id.as_u64() != config.chain_id {
            return Err(BridgeError::ProviderError(format!(
                "Chain ID mismatch: expected {}, got {}",
                config.chain_id, chain_id
            )));
        }

        let provider = Arc::new(provider);

        let signer = match &config.private_key {
            Some(private_key) => {
                let wallet = private_key
                    .parse::<LocalWallet>()
                    .map_err(|e| BridgeError::ProviderError(format!("Invalid private key: {}", e)))?
                    .with_chain_id(config.chain_id);
                info!("Bridge signer bound: {:?}", wallet.address());
                Some(Arc::new(SignerMiddleware::new(provider.clone(), wallet)))
            }
            None => None,
        };

        Ok(Self {
            provider,
            signer,
            config,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn signer(&self) -> Result<Arc<SignerClient>, BridgeError> {
        self.signer.clone().ok_or(BridgeError::SignerUnavailable)
    }

    pub fn wallet(&self) -> Option<LocalWallet> {
        self.signer.as_ref().map(|s| s.signer().clone())
    }

    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    /// Poll until `tx_hash` is mined with the configured confirmations.
    ///
    /// Runs until it succeeds; callers bound it with a timeout.
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: H256,
    ) -> Result<TransactionReceipt, BridgeError> {
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
                if receipt.status == Some(U64::zero()) {
                    return Err(BridgeError::TransactionReverted { tx_hash });
                }

                let mined_at = receipt.block_number.unwrap_or_default();
                let current = self.provider.get_block_number().await?;
                let confirmations = current.saturating_sub(mined_at).as_u64() + 1;
                if confirmations >= self.config.confirmations as u64 {
                    debug!("{:?} confirmed in block {}", tx_hash, mined_at);
                    return Ok(receipt);
                }
            }
            tokio::time::sleep(self.config.polling_interval).await;
        }
    }

    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, BridgeError> {
        Ok(self.provider.get_logs(filter).await?)
    }
}
