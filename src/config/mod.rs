// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod assets;
pub mod bridge;

pub use assets::{AssetDescriptor, AssetRegistry};
pub use bridge::{BridgeConfig, BusyPolicy, TimeoutConfig};
