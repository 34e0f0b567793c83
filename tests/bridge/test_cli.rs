// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Command parsing and output against the in-memory bridge

use clap::Parser;
use confidential_bridge::cli::commands::run;
use confidential_bridge::cli::{Cli, Commands};
use confidential_bridge::error::BridgeError;
use confidential_bridge::mock::MockBridge;

fn parse(args: &[&str]) -> Commands {
    let mut argv = vec!["bridge-cli"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("valid command line").command
}

async fn run_line(bridge: &MockBridge, args: &[&str]) -> anyhow::Result<String> {
    run(&bridge.orchestrator, parse(args)).await
}

#[test]
fn test_parses_global_options_after_subcommand() {
    let cli = Cli::try_parse_from([
        "bridge-cli",
        "mint",
        "zama",
        "250",
        "--rpc-url",
        "http://127.0.0.1:8545",
    ])
    .unwrap();
    assert_eq!(cli.global.rpc_url.as_deref(), Some("http://127.0.0.1:8545"));
    match cli.command {
        Commands::Mint(args) => {
            assert_eq!(args.asset, "zama");
            assert_eq!(args.amount, "250");
            assert!(args.to.is_none());
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_rejects_missing_amount() {
    assert!(Cli::try_parse_from(["bridge-cli", "wrap", "zama"]).is_err());
    assert!(Cli::try_parse_from(["bridge-cli", "launch"]).is_err());
}

#[tokio::test]
async fn test_mint_wrap_decrypt_output() {
    let bridge = MockBridge::new();

    let out = run_line(&bridge, &["mint", "zama", "250"]).await.unwrap();
    assert!(out.starts_with("✅ Minted 250 ZAMA to"));
    assert!(out.contains("   tx: 0x"));
    assert!(out.ends_with("state: Minted"));

    let out = run_line(&bridge, &["wrap", "ZAMA", "42"]).await.unwrap();
    assert!(out.starts_with("✅ Wrapped 42 ZAMA into the confidential balance of"));
    assert_eq!(out.matches("tx: ").count(), 2);

    let out = run_line(&bridge, &["decrypt-balance", "zama"]).await.unwrap();
    assert_eq!(
        out,
        format!("🔓 Confidential ZAMA balance of {:?}: 42", bridge.alice_address())
    );
}

#[tokio::test]
async fn test_unwrap_output_names_oracle_request() {
    let bridge = MockBridge::new();
    let bob = format!("{:?}", bridge.bob_address());
    run_line(&bridge, &["mint", "usdc", "10"]).await.unwrap();
    run_line(&bridge, &["wrap", "usdc", "10"]).await.unwrap();

    let out = run_line(&bridge, &["unwrap", "usdc", "3", "--recipient", &bob])
        .await
        .unwrap();
    assert!(out.starts_with(&format!("✅ Unwrapped 3 USDC to {}", bob)));
    assert!(out.contains("oracle request: #0"));
    assert!(out.contains("tokens released"));
}

#[tokio::test]
async fn test_balances_lists_configured_assets() {
    let bridge = MockBridge::new();
    run_line(&bridge, &["mint", "eth", "8"]).await.unwrap();

    let out = run_line(&bridge, &["balances"]).await.unwrap();
    assert!(out.contains("💼 ZAMA Test Token (ZAMA)"));
    assert!(out.contains("💼 ETH Test Token (ETH)"));
    assert!(out.contains("balance:      8"));
    assert!(out.contains("No confidential balance"));

    let out = run_line(&bridge, &["balances", "usdc"]).await.unwrap();
    assert!(out.contains("USDC"));
    assert!(!out.contains("ETH"));
}

#[tokio::test]
async fn test_reset_and_list() {
    let bridge = MockBridge::new();
    let out = run_line(&bridge, &["reset", "eth"]).await.unwrap();
    assert_eq!(out, "♻️  ETH session reset to Idle");

    let out = run_line(&bridge, &["list-assets"]).await.unwrap();
    assert!(out.starts_with("📋 Supported assets:"));
    assert_eq!(out.matches("confidential:").count(), 3);
}

#[tokio::test]
async fn test_errors_surface_as_bridge_errors() {
    let bridge = MockBridge::new();

    let err = run_line(&bridge, &["mint", "doge", "1"]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BridgeError>(),
        Some(BridgeError::UnknownAsset(_))
    ));

    let err = run_line(&bridge, &["mint", "zama", "1.2.3"]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BridgeError>(),
        Some(BridgeError::InvalidAmount(_))
    ));

    let err = run_line(&bridge, &["mint", "zama", "1", "--to", "0xnothex"])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BridgeError>(),
        Some(BridgeError::InvalidAddress(_))
    ));
}
