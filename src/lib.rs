// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod bridge;
pub mod cache;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod crypto;
pub mod error;
pub mod fhe;
pub mod mock;
pub mod utils;
pub mod version;

pub use bridge::{
    ActionOutcome, AssetPanel, BridgeAction, BridgeOrchestrator, LocalSignerProvider,
    SessionState, SignerProvider,
};
pub use cache::{BalanceCache, BalanceSnapshot};
pub use config::{AssetDescriptor, AssetRegistry, BridgeConfig};
pub use contracts::{AssetLedger, EthersLedger, Web3Client, Web3Config};
pub use error::{BridgeError, ErrorCategory};
pub use fhe::{
    AuthorizationSigner, CiphertextHandle, DecryptionOracleClient, EncryptionClient,
    EncryptionService, RelayerService,
};
