// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::BridgeError;
use crate::fhe::{AccountSigner, AuthorizationPayload};
use crate::utils::Clock;

/// Wallet-backed signer that can be told to decline or stall
pub struct MockSigner {
    wallet: LocalWallet,
    decline: AtomicBool,
    delay_ms: AtomicU64,
    signatures: AtomicUsize,
}

impl MockSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self {
            wallet,
            decline: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            signatures: AtomicUsize::new(0),
        }
    }

    pub fn random() -> Self {
        Self::new(LocalWallet::new(&mut rand::thread_rng()))
    }

    /// Decline every request until switched back
    pub fn set_decline(&self, decline: bool) {
        self.decline.store(decline, Ordering::SeqCst);
    }

    /// Time the "user" takes before answering
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Signature requests received, declined ones included
    pub fn requests(&self) -> usize {
        self.signatures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountSigner for MockSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_authorization(&self, payload: &AuthorizationPayload) -> Result<Bytes, BridgeError> {
        self.signatures.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.decline.load(Ordering::SeqCst) {
            return Err(BridgeError::AuthorizationDeclined);
        }

        let typed = payload.to_typed_data()?;
        let signature = self
            .wallet
            .sign_typed_data(&typed)
            .await
            .map_err(|e| BridgeError::ProviderError(e.to_string()))?;
        Ok(Bytes::from(signature.to_vec()))
    }
}

/// Settable clock in unix seconds
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
