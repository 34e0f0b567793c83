// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decryption oracle client
//!
//! An `unwrap` burns an encrypted amount and asks the on-chain decryption
//! oracle to publish it; the oracle announces the request with a
//! `DecryptionRequest` log inside the same transaction and later calls the
//! token back. Balance reads go the other way: the holder signs an
//! authorization and the oracle re-encrypts the ciphertext to an ephemeral key.

use ethers::types::{Address, TransactionReceipt, H256, U256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::authorization::{DecryptionAuthorization, EphemeralKeypair};
use super::types::{CiphertextHandle, EncryptedInput};
use super::EncryptionService;
use crate::config::AssetDescriptor;
use crate::contracts::events::DecryptionRequestEvent;
use crate::contracts::AssetLedger;
use crate::error::BridgeError;
use crate::utils::Clock;

pub struct DecryptionOracleClient {
    ledger: Arc<dyn AssetLedger>,
    service: Arc<dyn EncryptionService>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl DecryptionOracleClient {
    pub fn new(
        ledger: Arc<dyn AssetLedger>,
        service: Arc<dyn EncryptionService>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            service,
            clock,
            poll_interval,
        }
    }

    /// Submit `unwrap(from, to, handle, proof)` sent by `caller`
    ///
    /// Takes the input by value: once handed to the ledger it cannot be
    /// submitted again. The input must have been built for the asset's
    /// confidential contract and the sending account.
    pub async fn submit_unwrap(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        from: Address,
        to: Address,
        input: EncryptedInput,
    ) -> Result<H256, BridgeError> {
        if input.binding.contract != asset.confidential_address || input.binding.account != caller {
            return Err(BridgeError::InputBindingMismatch {
                contract: input.binding.contract,
                account: input.binding.account,
            });
        }
        let handle = input.first_handle().ok_or_else(|| {
            BridgeError::InvalidAmount("encrypted input has no values".to_string())
        })?;

        self.ledger
            .unwrap(asset, caller, from, to, handle, input.proof)
            .await
    }

    /// First `DecryptionRequest` in `receipt` raised on behalf of `expected`
    pub fn correlate(
        &self,
        receipt: &TransactionReceipt,
        expected: Address,
    ) -> Result<DecryptionRequestEvent, BridgeError> {
        let found = receipt
            .logs
            .iter()
            .filter_map(DecryptionRequestEvent::decode)
            .find(|event| event.contract_caller == expected);

        match found {
            Some(event) => {
                info!(
                    "🔗 Correlated decryption request {} ({} handle(s)) in {:?}",
                    event.request_id,
                    event.handles.len(),
                    receipt.transaction_hash
                );
                Ok(event)
            }
            None => Err(BridgeError::OracleRequestNotFound {
                tx_hash: receipt.transaction_hash,
                expected,
            }),
        }
    }

    /// Resolve `handles` of `contract` to cleartext through `authorization`
    ///
    /// Zero handles resolve to 0 locally. Anything else requires the
    /// authorization to be inside its window and to cover `contract`; the
    /// oracle round-trip is cut off when the window closes. The keypair is
    /// consumed and dropped on return.
    pub async fn resolve(
        &self,
        handles: &[CiphertextHandle],
        contract: Address,
        authorization: &DecryptionAuthorization,
        keypair: EphemeralKeypair,
    ) -> Result<HashMap<CiphertextHandle, U256>, BridgeError> {
        let mut values = HashMap::new();
        let pending: Vec<CiphertextHandle> = handles
            .iter()
            .copied()
            .filter(|handle| {
                if handle.is_zero() {
                    values.insert(*handle, U256::zero());
                    false
                } else {
                    true
                }
            })
            .collect();

        if pending.is_empty() {
            debug!("All handles are zero; skipping oracle");
            return Ok(values);
        }

        let now = self.clock.now();
        authorization.check(now, contract)?;
        let window = authorization.remaining(now);

        let resolved = match tokio::time::timeout(
            window,
            self.service.resolve(&pending, authorization, &keypair),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!("Authorization window closed while waiting for the oracle");
                return Err(BridgeError::AuthorizationExpired {
                    expired_at: authorization.expires_at(),
                });
            }
        };
        drop(keypair);

        for handle in pending {
            let value = resolved.get(&handle).copied().ok_or_else(|| {
                BridgeError::DecryptionFailed(format!("Oracle returned no value for {}", handle.short()))
            })?;
            values.insert(handle, value);
        }
        Ok(values)
    }

    /// Poll until the oracle has called back for `request_id`
    ///
    /// Runs until fulfilled; callers bound it with a timeout.
    pub async fn await_fulfillment(
        &self,
        asset: &AssetDescriptor,
        request_id: U256,
        since_block: u64,
    ) -> Result<(), BridgeError> {
        loop {
            if self
                .ledger
                .unwrap_finalized(asset, request_id, since_block)
                .await?
            {
                info!("✅ Decryption request {} fulfilled for {}", request_id, asset.symbol);
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
