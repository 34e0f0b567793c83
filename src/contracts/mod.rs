// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod events;
pub mod ledger;
pub mod types;

pub use client::{SignerClient, Web3Client, Web3Config};
pub use events::{DecryptionRequestEvent, UnwrapFinalizedEvent};
pub use ledger::{AssetLedger, EthersLedger};
pub use types::{ConfidentialToken, MintableErc20};
