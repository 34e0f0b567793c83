// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::debug;

use super::types::{EncryptedInput, InputBinding};
use super::EncryptionService;
use crate::error::BridgeError;

/// Builds encrypted inputs for one (contract, account) pair at a time
#[derive(Clone)]
pub struct EncryptionClient {
    service: Arc<dyn EncryptionService>,
}

impl EncryptionClient {
    pub fn new(service: Arc<dyn EncryptionService>) -> Self {
        Self { service }
    }

    pub fn is_ready(&self) -> bool {
        self.service.is_ready()
    }

    pub fn create_input(&self, contract: Address, account: Address) -> Result<InputBuilder, BridgeError> {
        if !self.service.is_ready() {
            return Err(BridgeError::ServiceUnavailable);
        }
        Ok(InputBuilder {
            service: self.service.clone(),
            binding: InputBinding { contract, account },
            values: Vec::new(),
        })
    }
}

/// Accumulates 64-bit values for a single encrypted input
pub struct InputBuilder {
    service: Arc<dyn EncryptionService>,
    binding: InputBinding,
    values: Vec<u64>,
}

impl InputBuilder {
    pub fn binding(&self) -> InputBinding {
        self.binding
    }

    pub fn add_uint64(&mut self, value: U256) -> Result<&mut Self, BridgeError> {
        if !self.service.is_ready() {
            return Err(BridgeError::ServiceUnavailable);
        }
        if value > U256::from(u64::MAX) {
            return Err(BridgeError::RangeError(value));
        }
        self.values.push(value.as_u64());
        Ok(self)
    }

    /// Encrypt everything added so far
    ///
    /// Every call draws fresh randomness, so encrypting the same values twice
    /// yields different handles.
    pub async fn encrypt(self) -> Result<EncryptedInput, BridgeError> {
        if !self.service.is_ready() {
            return Err(BridgeError::ServiceUnavailable);
        }
        if self.values.is_empty() {
            return Err(BridgeError::InvalidAmount(
                "encrypted input has no values".to_string(),
            ));
        }

        let input = self.service.encrypt(self.binding, &self.values).await?;
        if input.handles.len() != self.values.len() || input.binding != self.binding {
            return Err(BridgeError::ProviderError(format!(
                "Encryption service returned {} handle(s) for {} value(s)",
                input.handles.len(),
                self.values.len()
            )));
        }

        debug!(
            "Encrypted {} value(s) for contract {:?} / account {:?}",
            self.values.len(),
            self.binding.contract,
            self.binding.account
        );
        Ok(input)
    }
}
