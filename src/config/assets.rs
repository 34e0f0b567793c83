// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::BridgeError;

/// Static description of one bridgeable asset pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub key: String,
    pub label: String,
    pub symbol: String,
    pub decimals: u8,
    pub underlying_address: Address,
    pub confidential_address: Address,
}

impl AssetDescriptor {
    /// Both contracts have a non-zero address
    pub fn is_configured(&self) -> bool {
        !self.underlying_address.is_zero() && !self.confidential_address.is_zero()
    }
}

// (key, label, symbol, underlying deployment, confidential deployment)
const BUILTIN_ASSETS: &[(&str, &str, &str, &str, &str)] = &[
    ("zama", "Zama Test Token", "ZAMA", "ZamaToken", "ConfidentialZamaToken"),
    ("usdc", "USD Coin Test Token", "USDC", "USDCTestToken", "ConfidentialUSDCToken"),
    ("eth", "Ether Test Token", "ETH", "ETHTestToken", "ConfidentialETHToken"),
];

const BUILTIN_DECIMALS: u8 = 6;

#[derive(Deserialize)]
struct AssetFile {
    assets: Vec<AssetDescriptor>,
}

#[derive(Deserialize)]
struct DeploymentArtifact {
    address: Address,
}

/// Immutable set of assets, loaded once and shared across sessions
#[derive(Clone, Debug, Default)]
pub struct AssetRegistry {
    assets: Vec<Arc<AssetDescriptor>>,
}

impl AssetRegistry {
    pub fn new(assets: Vec<AssetDescriptor>) -> Self {
        Self {
            assets: assets.into_iter().map(Arc::new).collect(),
        }
    }

    /// Built-in assets with addresses from `BRIDGE_<KEY>_UNDERLYING` /
    /// `BRIDGE_<KEY>_CONFIDENTIAL`; unset addresses stay zero
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut assets = Vec::new();
        for (key, label, symbol, _, _) in BUILTIN_ASSETS {
            let upper = key.to_uppercase();
            assets.push(AssetDescriptor {
                key: key.to_string(),
                label: label.to_string(),
                symbol: symbol.to_string(),
                decimals: BUILTIN_DECIMALS,
                underlying_address: env_address(&format!("BRIDGE_{}_UNDERLYING", upper))?,
                confidential_address: env_address(&format!("BRIDGE_{}_CONFIDENTIAL", upper))?,
            });
        }
        Ok(Self::new(assets))
    }

    /// TOML file with an `[[assets]]` array
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read asset file {}: {}", path.display(), e))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: AssetFile =
            toml::from_str(raw).map_err(|e| anyhow!("Invalid asset file: {}", e))?;
        let mut seen = std::collections::HashSet::new();
        for asset in &file.assets {
            if !seen.insert(asset.key.to_lowercase()) {
                return Err(anyhow!("Duplicate asset key {}", asset.key));
            }
        }
        Ok(Self::new(file.assets))
    }

    /// Built-in assets with addresses read from a hardhat-deploy
    /// `deployments/<network>/` directory
    pub fn from_deployments(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut assets = Vec::new();
        for (key, label, symbol, underlying, confidential) in BUILTIN_ASSETS {
            assets.push(AssetDescriptor {
                key: key.to_string(),
                label: label.to_string(),
                symbol: symbol.to_string(),
                decimals: BUILTIN_DECIMALS,
                underlying_address: read_deployment(dir, underlying)?,
                confidential_address: read_deployment(dir, confidential)?,
            });
        }
        Ok(Self::new(assets))
    }

    /// Case-insensitive lookup by key
    pub fn resolve(&self, key: &str) -> Result<Arc<AssetDescriptor>, BridgeError> {
        let wanted = key.to_lowercase();
        self.assets
            .iter()
            .find(|a| a.key.to_lowercase() == wanted)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownAsset(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AssetDescriptor>> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn env_address(var: &str) -> Result<Address> {
    match std::env::var(var) {
        Ok(value) => Address::from_str(value.trim()).map_err(|e| anyhow!("Invalid {}: {}", var, e)),
        Err(_) => Ok(Address::zero()),
    }
}

fn read_deployment(dir: &Path, name: &str) -> Result<Address> {
    let path = dir.join(format!("{}.json", name));
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| anyhow!("Missing deployment {}: {}", path.display(), e))?;
    let artifact: DeploymentArtifact = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("Invalid deployment {}: {}", path.display(), e))?;
    Ok(artifact.address)
}
