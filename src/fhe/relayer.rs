// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP relayer backend for [`EncryptionService`]
//!
//! Wire protocol (JSON, camelCase):
//!
//! - `GET  /v1/keyurl` → `{ publicKey }`, the relayer's secp256k1 key
//! - `POST /v1/input-proof` with plaintext values sealed to the relayer key
//!   (AAD = contract ‖ account) → `{ handles, inputProof }`
//! - `POST /v1/user-decrypt` with a signed authorization → `{ results }`, each
//!   value sealed to the authorization's ephemeral key (AAD = handle)

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::authorization::{AuthorizationDomain, DecryptionAuthorization, EphemeralKeypair};
use super::types::{CiphertextHandle, EncryptedInput, InputBinding};
use super::EncryptionService;
use crate::config::BridgeConfig;
use crate::crypto::{parse_public_key, SealedBox};
use crate::error::BridgeError;

const INPUT_PROOF_PATH: &str = "/v1/input-proof";
const USER_DECRYPT_PATH: &str = "/v1/user-decrypt";

#[derive(Debug, Clone)]
pub struct RelayerConfig {
    pub url: String,
    pub chain_id: u64,
    pub decryption_contract: Address,
    pub request_timeout: Duration,
}

impl RelayerConfig {
    pub fn from_bridge(config: &BridgeConfig) -> Self {
        Self {
            url: config.relayer_url.clone(),
            chain_id: config.chain_id,
            decryption_contract: config.decryption_contract,
            request_timeout: config.timeouts.oracle(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyResponse {
    public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputPlaintext {
    bits: u32,
    values: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputProofRequest {
    contract_address: Address,
    user_address: Address,
    sealed_values: SealedBox,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputProofResponse {
    handles: Vec<String>,
    input_proof: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDecryptRequest {
    handles: Vec<String>,
    contract_addresses: Vec<Address>,
    user_address: Address,
    public_key: String,
    signature: String,
    start_timestamp: String,
    duration_days: String,
}

#[derive(Debug, Deserialize)]
struct UserDecryptResponse {
    results: Vec<SealedResult>,
}

#[derive(Debug, Deserialize)]
struct SealedResult {
    handle: String,
    sealed: SealedBox,
}

/// AAD binding a sealed input to its (contract, account) pair
fn binding_aad(binding: &InputBinding) -> Vec<u8> {
    let mut aad = Vec::with_capacity(40);
    aad.extend_from_slice(binding.contract.as_bytes());
    aad.extend_from_slice(binding.account.as_bytes());
    aad
}

pub struct RelayerService {
    client: Client,
    endpoint: String,
    domain: AuthorizationDomain,
    relayer_key: OnceCell<Vec<u8>>,
}

impl RelayerService {
    pub fn new(config: RelayerConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let endpoint = config.url.trim_end_matches('/').to_string();
        info!("Relayer configured: endpoint={}, chain={}", endpoint, config.chain_id);

        Ok(Self {
            client,
            endpoint,
            domain: AuthorizationDomain::new(config.chain_id, config.decryption_contract),
            relayer_key: OnceCell::new(),
        })
    }

    /// Fetch the relayer's public key; the service is not ready until this succeeds
    pub async fn initialize(&self) -> Result<(), BridgeError> {
        if self.relayer_key.initialized() {
            return Ok(());
        }

        let url = format!("{}/v1/keyurl", self.endpoint);
        debug!("Relayer key GET {}", url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BridgeError::ProviderError(format!(
                "relayer key endpoint returned {}",
                response.status()
            )));
        }

        let body: KeyResponse = response.json().await?;
        let key = hex::decode(body.public_key.trim_start_matches("0x"))
            .map_err(|e| BridgeError::ProviderError(format!("Invalid relayer key: {}", e)))?;
        parse_public_key(&key)
            .map_err(|e| BridgeError::ProviderError(format!("Invalid relayer key: {}", e)))?;

        // a concurrent initialize may have won; either key came from the relayer
        let _ = self.relayer_key.set(key);
        info!("🔐 Relayer key material loaded");
        Ok(())
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, BridgeError> {
        let url = format!("{}{}", self.endpoint, path);
        debug!("Relayer POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(path, status, &text));
        }
        Ok(response.json().await?)
    }
}

/// A rejected input proof is an encryption backend failure; a rejected
/// user decrypt is an oracle failure
fn status_error(path: &str, status: StatusCode, body: &str) -> BridgeError {
    let message = format!("relayer returned {} for {}: {}", status, path, body);
    match path {
        INPUT_PROOF_PATH if status == StatusCode::SERVICE_UNAVAILABLE => {
            BridgeError::ServiceUnavailable
        }
        INPUT_PROOF_PATH => BridgeError::ProviderError(message),
        _ => BridgeError::DecryptionFailed(message),
    }
}

#[async_trait]
impl EncryptionService for RelayerService {
    fn is_ready(&self) -> bool {
        self.relayer_key.initialized()
    }

    fn domain(&self) -> AuthorizationDomain {
        self.domain.clone()
    }

    async fn encrypt(
        &self,
        binding: InputBinding,
        values: &[u64],
    ) -> Result<EncryptedInput, BridgeError> {
        let relayer_key = self.relayer_key.get().ok_or(BridgeError::ServiceUnavailable)?;

        let plaintext = serde_json::to_vec(&InputPlaintext {
            bits: 64,
            values: values.iter().map(|v| v.to_string()).collect(),
        })
        .map_err(|e| BridgeError::ProviderError(format!("Failed to encode input: {}", e)))?;
        let sealed_values = SealedBox::seal(&plaintext, relayer_key, &binding_aad(&binding))
            .map_err(|e| BridgeError::ProviderError(format!("Failed to seal input: {}", e)))?;

        let response: InputProofResponse = self
            .post_json(
                INPUT_PROOF_PATH,
                &InputProofRequest {
                    contract_address: binding.contract,
                    user_address: binding.account,
                    sealed_values,
                },
            )
            .await?;

        let handles = response
            .handles
            .iter()
            .map(|h| h.parse::<CiphertextHandle>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::ProviderError(format!("Invalid handle from relayer: {}", e)))?;
        let proof = hex::decode(response.input_proof.trim_start_matches("0x"))
            .map_err(|e| BridgeError::ProviderError(format!("Invalid input proof: {}", e)))?;

        Ok(EncryptedInput {
            handles,
            proof: Bytes::from(proof),
            binding,
        })
    }

    async fn resolve(
        &self,
        handles: &[CiphertextHandle],
        authorization: &DecryptionAuthorization,
        keypair: &EphemeralKeypair,
    ) -> Result<HashMap<CiphertextHandle, U256>, BridgeError> {
        if !self.is_ready() {
            return Err(BridgeError::ServiceUnavailable);
        }

        let request = UserDecryptRequest {
            handles: handles.iter().map(|h| h.to_hex()).collect(),
            contract_addresses: authorization.contract_addresses.clone(),
            user_address: authorization.signer,
            public_key: format!("0x{}", hex::encode(&authorization.public_key)),
            signature: format!("0x{}", hex::encode(&authorization.signature)),
            start_timestamp: authorization.start_timestamp.to_string(),
            duration_days: authorization.duration_days.to_string(),
        };
        let response: UserDecryptResponse = self.post_json(USER_DECRYPT_PATH, &request).await?;

        let mut values = HashMap::new();
        for result in response.results {
            let handle = result
                .handle
                .parse::<CiphertextHandle>()
                .map_err(|e| BridgeError::DecryptionFailed(format!("Invalid handle: {}", e)))?;
            let plaintext = keypair
                .open(&result.sealed, handle.as_bytes())
                .map_err(|e| BridgeError::DecryptionFailed(e.to_string()))?;
            if plaintext.len() != 32 {
                return Err(BridgeError::DecryptionFailed(format!(
                    "Expected a 32-byte cleartext, got {}",
                    plaintext.len()
                )));
            }
            values.insert(handle, U256::from_big_endian(&plaintext));
        }
        Ok(values)
    }
}
