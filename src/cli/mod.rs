// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::version::VERSION_NUMBER;

/// Confidential Bridge CLI
#[derive(Parser, Debug)]
#[command(name = "bridge-cli")]
#[command(version = VERSION_NUMBER)]
#[command(about = "Bridge test tokens into and out of their confidential counterparts", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Bridge configuration file (TOML)
    #[arg(long, env = "BRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Asset list file (TOML with [[assets]])
    #[arg(long, env = "BRIDGE_ASSETS", global = true)]
    pub assets: Option<PathBuf>,

    /// hardhat-deploy deployments directory for the selected network
    #[arg(long, env = "BRIDGE_DEPLOYMENTS", global = true)]
    pub deployments: Option<PathBuf>,

    /// JSON-RPC endpoint, overrides the config file
    #[arg(long, env = "BRIDGE_RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Private key of the holder (can also be set via BRIDGE_PRIVATE_KEY env var)
    #[arg(long, env = "BRIDGE_PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List supported assets and their contract addresses
    ListAssets,

    /// Mint test tokens of an asset
    Mint(commands::MintArgs),

    /// Wrap tokens into their confidential counterpart
    Wrap(commands::WrapArgs),

    /// Unwrap confidential tokens back to plain tokens
    Unwrap(commands::UnwrapArgs),

    /// Decrypt a confidential balance
    DecryptBalance(commands::DecryptArgs),

    /// Show plain and confidential balances per asset
    Balances(commands::BalancesArgs),

    /// Re-read balances and clear a faulted session
    Reset(commands::ResetArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    if let Commands::ListAssets = cli.command {
        let assets = commands::load_assets(&cli.global, &commands::load_config(&cli.global)?)?;
        println!("{}", commands::describe_assets(assets.iter().map(|a| a.as_ref())));
        return Ok(());
    }

    let orchestrator = commands::connect(&cli.global).await?;
    let output = commands::run(&orchestrator, cli.command).await?;
    println!("{}", output);
    Ok(())
}
