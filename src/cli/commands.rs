// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use ethers::types::Address;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Commands, GlobalArgs};
use crate::bridge::{
    format_units, parse_units, ActionOutcome, AssetPanel, BridgeOrchestrator, LocalSignerProvider,
};
use crate::config::{AssetDescriptor, AssetRegistry, BridgeConfig};
use crate::contracts::{EthersLedger, Web3Client, Web3Config};
use crate::error::BridgeError;
use crate::fhe::{RelayerConfig, RelayerService};
use crate::utils::SystemClock;

/// Arguments for the mint command
#[derive(Args, Debug, Clone)]
pub struct MintArgs {
    /// Asset key (zama, usdc, eth)
    pub asset: String,

    /// Amount in whole tokens, e.g. 250 or 1.5
    pub amount: String,

    /// Recipient (defaults to the signer)
    #[arg(long)]
    pub to: Option<String>,
}

/// Arguments for the wrap command
#[derive(Args, Debug, Clone)]
pub struct WrapArgs {
    pub asset: String,

    pub amount: String,

    /// Owner of the new confidential balance (defaults to the signer)
    #[arg(long)]
    pub recipient: Option<String>,
}

/// Arguments for the unwrap command
#[derive(Args, Debug, Clone)]
pub struct UnwrapArgs {
    pub asset: String,

    pub amount: String,

    /// Holder whose confidential balance is burnt; must have a signer
    #[arg(long)]
    pub from: Option<String>,

    /// Receiver of the plain tokens (defaults to the holder)
    #[arg(long)]
    pub recipient: Option<String>,
}

/// Arguments for the decrypt-balance command
#[derive(Args, Debug, Clone)]
pub struct DecryptArgs {
    pub asset: String,

    /// Holder to decrypt for; must have a signer
    #[arg(long)]
    pub holder: Option<String>,
}

/// Arguments for the balances command
#[derive(Args, Debug, Clone)]
pub struct BalancesArgs {
    /// Only this asset
    pub asset: Option<String>,

    #[arg(long)]
    pub holder: Option<String>,
}

/// Arguments for the reset command
#[derive(Args, Debug, Clone)]
pub struct ResetArgs {
    pub asset: String,

    #[arg(long)]
    pub holder: Option<String>,
}

pub fn parse_address(raw: &str) -> Result<Address, BridgeError> {
    Address::from_str(raw.trim()).map_err(|_| BridgeError::InvalidAddress(raw.to_string()))
}

fn parse_optional(raw: Option<&str>) -> Result<Option<Address>, BridgeError> {
    raw.map(parse_address).transpose()
}

/// `--config` file if given, otherwise defaults plus `BRIDGE_*` env
pub fn load_config(global: &GlobalArgs) -> Result<BridgeConfig> {
    let mut config = match &global.config {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::from_env()?,
    };
    if let Some(rpc_url) = &global.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    Ok(config)
}

/// `--assets` file, then `--deployments`, then `deployments/<network>` when
/// present, then addresses from the environment
pub fn load_assets(global: &GlobalArgs, config: &BridgeConfig) -> Result<AssetRegistry> {
    if let Some(path) = &global.assets {
        return AssetRegistry::from_file(path);
    }
    if let Some(dir) = &global.deployments {
        return AssetRegistry::from_deployments(dir);
    }
    let default_dir = Path::new("deployments").join(&config.network);
    if default_dir.is_dir() {
        info!("Using deployments from {}", default_dir.display());
        return AssetRegistry::from_deployments(default_dir);
    }
    AssetRegistry::from_env()
}

/// Wire the orchestrator to the configured chain and relayer
///
/// An unreachable relayer is not fatal: mint and wrap still work, and
/// unwrap/decrypt report the service as unavailable.
pub async fn connect(global: &GlobalArgs) -> Result<BridgeOrchestrator> {
    let config = load_config(global)?;
    let assets = load_assets(global, &config)?;

    let client = Web3Client::new(Web3Config::from_bridge(&config, global.private_key.clone())).await?;
    let signers = match client.wallet() {
        Some(wallet) => LocalSignerProvider::from_wallet(wallet),
        None => {
            warn!("No private key configured; write commands will fail");
            LocalSignerProvider::new()
        }
    };
    let ledger = Arc::new(EthersLedger::new(Arc::new(client)));

    let relayer = RelayerService::new(RelayerConfig::from_bridge(&config))?;
    if let Err(e) = relayer.initialize().await {
        warn!("⚠️  Encryption service unavailable: {}", e);
    }

    Ok(BridgeOrchestrator::new(
        config,
        assets,
        ledger,
        Arc::new(relayer),
        Arc::new(signers),
        Arc::new(SystemClock),
    ))
}

fn holder_or_default(
    orchestrator: &BridgeOrchestrator,
    raw: Option<&str>,
) -> Result<Address, BridgeError> {
    match parse_optional(raw)? {
        Some(holder) => Ok(holder),
        None => orchestrator
            .default_holder()
            .ok_or(BridgeError::SignerUnavailable),
    }
}

pub fn describe_assets<'a>(assets: impl Iterator<Item = &'a AssetDescriptor>) -> String {
    let mut out = String::from("📋 Supported assets:");
    for asset in assets {
        let _ = write!(out, "\n  {:<6} {} ({})", asset.key, asset.label, asset.symbol);
        if asset.is_configured() {
            let _ = write!(
                out,
                "\n         token:        {:?}\n         confidential: {:?}",
                asset.underlying_address, asset.confidential_address
            );
        } else {
            out.push_str("\n         ⚠️  contracts not configured");
        }
    }
    out
}

fn describe_transactions(out: &mut String, outcome: &ActionOutcome) {
    for tx in &outcome.transactions {
        let _ = write!(out, "\n   tx: {:?}", tx);
    }
    let _ = write!(out, "\n   state: {}", outcome.state);
}

pub fn describe_panel(panel: &AssetPanel) -> String {
    let mut out = format!("💼 {} ({})", panel.label, panel.symbol);
    let _ = write!(
        out,
        "\n   balance:      {}",
        panel.plaintext_balance.as_deref().unwrap_or("unknown")
    );
    let _ = write!(out, "\n   confidential: {}", panel.ciphertext);
    let _ = write!(out, "\n   state:        {}", panel.state);
    if let Some(notice) = &panel.notice {
        let _ = write!(out, "\n   ⚠️  {}", notice);
    }
    out
}

/// Run one command and return what to print
pub async fn run(orchestrator: &BridgeOrchestrator, command: Commands) -> Result<String> {
    match command {
        Commands::ListAssets => Ok(describe_assets(
            orchestrator.list_assets().iter().map(|a| a.as_ref()),
        )),

        Commands::Mint(args) => {
            let asset = orchestrator.asset(&args.asset)?;
            let amount = parse_units(&args.amount, asset.decimals)?;
            let holder = holder_or_default(orchestrator, None)?;
            let to = parse_optional(args.to.as_deref())?;

            let outcome = orchestrator.mint(holder, &asset.key, amount, to).await?;
            let mut out = format!(
                "✅ Minted {} {} to {:?}",
                format_units(amount, asset.decimals),
                asset.symbol,
                to.unwrap_or(holder)
            );
            describe_transactions(&mut out, &outcome);
            Ok(out)
        }

        Commands::Wrap(args) => {
            let asset = orchestrator.asset(&args.asset)?;
            let amount = parse_units(&args.amount, asset.decimals)?;
            let holder = holder_or_default(orchestrator, None)?;
            let recipient = parse_optional(args.recipient.as_deref())?;

            let outcome = orchestrator.wrap(holder, &asset.key, amount, recipient).await?;
            let mut out = format!(
                "✅ Wrapped {} {} into the confidential balance of {:?}",
                format_units(amount, asset.decimals),
                asset.symbol,
                recipient.unwrap_or(holder)
            );
            describe_transactions(&mut out, &outcome);
            Ok(out)
        }

        Commands::Unwrap(args) => {
            let asset = orchestrator.asset(&args.asset)?;
            let amount = parse_units(&args.amount, asset.decimals)?;
            let holder = holder_or_default(orchestrator, args.from.as_deref())?;
            let recipient = parse_optional(args.recipient.as_deref())?;

            let outcome = orchestrator
                .unwrap(holder, &asset.key, amount, recipient)
                .await?;
            let mut out = format!(
                "✅ Unwrapped {} {} to {:?}",
                format_units(amount, asset.decimals),
                asset.symbol,
                recipient.unwrap_or(holder)
            );
            if let Some(request) = &outcome.oracle_request {
                let _ = write!(out, "\n   oracle request: #{}", request.request_id);
            }
            match outcome.fulfilled {
                Some(true) => out.push_str("\n   tokens released"),
                Some(false) => out.push_str("\n   ⏳ waiting for the oracle; tokens arrive once it responds"),
                None => {}
            }
            describe_transactions(&mut out, &outcome);
            Ok(out)
        }

        Commands::DecryptBalance(args) => {
            let asset = orchestrator.asset(&args.asset)?;
            let holder = holder_or_default(orchestrator, args.holder.as_deref())?;

            let outcome = orchestrator.decrypt_balance(holder, &asset.key).await?;
            let value = outcome
                .value
                .ok_or_else(|| anyhow!("decryption returned no value"))?;
            Ok(format!(
                "🔓 Confidential {} balance of {:?}: {}",
                asset.symbol,
                holder,
                format_units(value, asset.decimals)
            ))
        }

        Commands::Balances(args) => {
            let holder = holder_or_default(orchestrator, args.holder.as_deref())?;
            let keys: Vec<String> = match &args.asset {
                Some(key) => vec![orchestrator.asset(key)?.key.clone()],
                None => orchestrator
                    .list_assets()
                    .iter()
                    .filter(|a| a.is_configured())
                    .map(|a| a.key.clone())
                    .collect(),
            };

            let refreshes = keys
                .iter()
                .map(|key| orchestrator.refresh_balances(holder, key));
            for (key, result) in keys.iter().zip(futures::future::join_all(refreshes).await) {
                if let Err(e) = result {
                    warn!("Could not read {} balances: {}", key, e);
                }
            }

            let panels = orchestrator.panels(holder).await;
            let lines: Vec<String> = panels
                .iter()
                .filter(|p| keys.contains(&p.asset))
                .map(describe_panel)
                .collect();
            Ok(lines.join("\n"))
        }

        Commands::Reset(args) => {
            let asset = orchestrator.asset(&args.asset)?;
            let holder = holder_or_default(orchestrator, args.holder.as_deref())?;
            let outcome = orchestrator.reset_session(holder, &asset.key).await?;
            Ok(format!("♻️  {} session reset to {}", asset.symbol, outcome.state))
        }
    }
}
