// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// What a session does when an action arrives while another is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Wait behind the outstanding action (FIFO)
    Queue,
    /// Fail fast with `SessionBusy`
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub ledger_call_secs: u64,
    pub confirmation_secs: u64,
    pub encryption_secs: u64,
    pub signer_secs: u64,
    pub oracle_secs: u64,
    pub fulfillment_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ledger_call_secs: 30,
            confirmation_secs: 120,
            encryption_secs: 60,
            // signing waits on a human
            signer_secs: 300,
            oracle_secs: 120,
            fulfillment_secs: 300,
        }
    }
}

impl TimeoutConfig {
    pub fn ledger_call(&self) -> Duration {
        Duration::from_secs(self.ledger_call_secs)
    }

    pub fn confirmation(&self) -> Duration {
        Duration::from_secs(self.confirmation_secs)
    }

    pub fn encryption(&self) -> Duration {
        Duration::from_secs(self.encryption_secs)
    }

    pub fn signer(&self) -> Duration {
        Duration::from_secs(self.signer_secs)
    }

    pub fn oracle(&self) -> Duration {
        Duration::from_secs(self.oracle_secs)
    }

    pub fn fulfillment(&self) -> Duration {
        Duration::from_secs(self.fulfillment_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// hardhat-deploy network name, used to locate deployment artifacts
    pub network: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub confirmations: usize,
    pub poll_interval_ms: u64,
    pub relayer_url: String,
    /// EIP-712 verifying contract for decryption authorizations
    pub decryption_contract: Address,
    pub authorization_days: u64,
    /// Width of the confidential integer type; bounds every bridged amount
    pub amount_bits: u32,
    pub busy_policy: BusyPolicy,
    pub await_fulfillment: bool,
    pub timeouts: TimeoutConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            network: "localhost".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            confirmations: 1,
            poll_interval_ms: 500,
            relayer_url: "http://localhost:3000".to_string(),
            decryption_contract: Address::zero(),
            authorization_days: 7,
            amount_bits: 64,
            busy_policy: BusyPolicy::Queue,
            await_fulfillment: true,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `BRIDGE_*` environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: BridgeConfig = toml::from_str(&raw)
            .map_err(|e| anyhow!("Invalid config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(network) = std::env::var("BRIDGE_NETWORK") {
            self.network = network;
        }
        if let Ok(url) = std::env::var("BRIDGE_RPC_URL") {
            self.rpc_url = url;
        }
        if let Ok(chain_id) = std::env::var("BRIDGE_CHAIN_ID") {
            self.chain_id = chain_id
                .parse()
                .map_err(|e| anyhow!("Invalid BRIDGE_CHAIN_ID: {}", e))?;
        }
        if let Ok(confirmations) = std::env::var("BRIDGE_CONFIRMATIONS") {
            self.confirmations = confirmations
                .parse()
                .map_err(|e| anyhow!("Invalid BRIDGE_CONFIRMATIONS: {}", e))?;
        }
        if let Ok(url) = std::env::var("BRIDGE_RELAYER_URL") {
            self.relayer_url = url;
        }
        if let Ok(addr) = std::env::var("BRIDGE_DECRYPTION_CONTRACT") {
            self.decryption_contract = Address::from_str(&addr)
                .map_err(|e| anyhow!("Invalid BRIDGE_DECRYPTION_CONTRACT: {}", e))?;
        }
        if let Ok(days) = std::env::var("BRIDGE_AUTHORIZATION_DAYS") {
            self.authorization_days = days
                .parse()
                .map_err(|e| anyhow!("Invalid BRIDGE_AUTHORIZATION_DAYS: {}", e))?;
        }
        if let Ok(bits) = std::env::var("BRIDGE_AMOUNT_BITS") {
            self.amount_bits = bits
                .parse()
                .map_err(|e| anyhow!("Invalid BRIDGE_AMOUNT_BITS: {}", e))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount_bits == 0 || self.amount_bits > 256 {
            return Err(anyhow!(
                "amount_bits must be between 1 and 256, got {}",
                self.amount_bits
            ));
        }
        if self.authorization_days == 0 {
            return Err(anyhow!("authorization_days must be at least 1"));
        }
        url::Url::parse(&self.relayer_url)
            .map_err(|e| anyhow!("Invalid relayer_url {}: {}", self.relayer_url, e))?;
        Ok(())
    }

    /// Largest amount representable by the confidential integer type
    pub fn amount_ceiling(&self) -> U256 {
        if self.amount_bits >= 256 {
            U256::MAX
        } else {
            (U256::one() << self.amount_bits) - 1
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
