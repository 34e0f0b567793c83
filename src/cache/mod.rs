// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Last-observed balances per (holder, asset)
//!
//! Entries are written only by the session that owns the key, after each
//! action it runs. Everyone else reads.

use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::AssetDescriptor;
use crate::contracts::AssetLedger;
use crate::error::BridgeError;
use crate::fhe::types::CiphertextHandle;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    pub holder: Address,
    pub asset: String,
}

impl BalanceKey {
    pub fn new(holder: Address, asset: &str) -> Self {
        Self {
            holder,
            asset: asset.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub holder: Address,
    pub asset: String,
    pub underlying_balance: U256,
    pub confidential_handle: CiphertextHandle,
    pub observed_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// Confidential handle is the zero sentinel
    pub fn never_wrapped(&self) -> bool {
        self.confidential_handle.is_zero()
    }

    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.holder, &self.asset)
    }
}

#[derive(Clone, Default)]
pub struct BalanceCache {
    entries: Arc<RwLock<HashMap<BalanceKey, BalanceSnapshot>>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, holder: Address, asset: &str) -> Option<BalanceSnapshot> {
        self.entries
            .read()
            .await
            .get(&BalanceKey::new(holder, asset))
            .cloned()
    }

    pub async fn invalidate(&self, holder: Address, asset: &str) {
        if self
            .entries
            .write()
            .await
            .remove(&BalanceKey::new(holder, asset))
            .is_some()
        {
            debug!("Invalidated cached balances for {:?}/{}", holder, asset);
        }
    }

    /// Re-query both balances and replace the entry
    ///
    /// On error the entry stays invalidated rather than stale.
    pub async fn refresh(
        &self,
        ledger: &dyn AssetLedger,
        asset: &AssetDescriptor,
        holder: Address,
    ) -> Result<BalanceSnapshot, BridgeError> {
        self.invalidate(holder, &asset.key).await;

        let (underlying_balance, confidential_handle) = tokio::try_join!(
            ledger.balance_of(asset, holder),
            ledger.confidential_balance_of(asset, holder),
        )?;
        let snapshot = BalanceSnapshot {
            holder,
            asset: asset.key.to_lowercase(),
            underlying_balance,
            confidential_handle,
            observed_at: Utc::now(),
        };

        self.entries
            .write()
            .await
            .insert(snapshot.key(), snapshot.clone());
        debug!(
            "Balances for {:?}/{}: underlying={}, handle={}",
            holder,
            asset.key,
            underlying_balance,
            confidential_handle.short()
        );
        Ok(snapshot)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
