// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Render-agnostic view model, one panel per asset

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use super::amount::format_units;
use super::session::SessionState;
use crate::cache::BalanceSnapshot;
use crate::config::AssetDescriptor;
use crate::fhe::CiphertextHandle;

pub const NO_CONFIDENTIAL_BALANCE: &str = "No confidential balance";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelControls {
    pub mint: bool,
    pub wrap: bool,
    pub unwrap: bool,
    pub decrypt: bool,
}

impl PanelControls {
    pub fn any_enabled(&self) -> bool {
        self.mint || self.wrap || self.unwrap || self.decrypt
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPanel {
    pub asset: String,
    pub label: String,
    pub symbol: String,
    pub holder: Address,
    /// Formatted whole units; `None` until balances have been read
    pub plaintext_balance: Option<String>,
    pub ciphertext: String,
    pub state: SessionState,
    pub busy: bool,
    pub service_ready: bool,
    pub configured: bool,
    pub controls: PanelControls,
    pub notice: Option<String>,
}

/// Sentinel-aware display of a balance handle
pub fn ciphertext_display(handle: Option<CiphertextHandle>) -> String {
    match handle {
        None => "Unknown".to_string(),
        Some(h) if h.is_zero() => NO_CONFIDENTIAL_BALANCE.to_string(),
        Some(h) => h.short(),
    }
}

impl AssetPanel {
    pub fn build(
        asset: &AssetDescriptor,
        holder: Address,
        snapshot: Option<&BalanceSnapshot>,
        state: SessionState,
        busy: bool,
        service_ready: bool,
    ) -> Self {
        let configured = asset.is_configured();
        let underlying = snapshot.map(|s| s.underlying_balance);
        let handle = snapshot.map(|s| s.confidential_handle);

        let controls = if !configured || busy || !service_ready || state.is_faulted() {
            PanelControls::default()
        } else {
            PanelControls {
                mint: true,
                wrap: underlying.map_or(true, |b| b > U256::zero()),
                unwrap: handle.map_or(true, |h| !h.is_zero()),
                decrypt: true,
            }
        };

        let notice = if !configured {
            Some(format!("Contracts for {} are not configured", asset.symbol))
        } else if !service_ready {
            Some("Encryption service is initializing".to_string())
        } else if let SessionState::Error(kind) = state {
            Some(format!("Session faulted ({}); reset to continue", kind))
        } else if busy {
            Some(format!("{} in progress", state))
        } else {
            None
        };

        Self {
            asset: asset.key.clone(),
            label: asset.label.clone(),
            symbol: asset.symbol.clone(),
            holder,
            plaintext_balance: underlying.map(|b| format_units(b, asset.decimals)),
            ciphertext: ciphertext_display(handle),
            state,
            busy,
            service_ready,
            configured,
            controls,
            notice,
        }
    }
}
