// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User decryption authorizations
//!
//! Reading a confidential balance requires the holder to sign an EIP-712
//! `UserDecryptRequestVerification` message naming a fresh ephemeral public
//! key, the contracts whose ciphertexts may be re-encrypted to it, and a
//! validity window. The oracle re-encrypts results to that public key; the
//! matching private key is dropped right after the results are opened.

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::{Eip712, TypedData};
use ethers::types::{Address, Bytes, H256};
use k256::SecretKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::EncryptionService;
use crate::crypto::{generate_secret, public_key_bytes, recover_signer, SealedBox};
use crate::error::BridgeError;

pub const SECONDS_PER_DAY: u64 = 86_400;

pub const AUTHORIZATION_PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

/// Single-use keypair the oracle re-encrypts results to
///
/// Deliberately neither `Clone` nor `Serialize`; the secret is zeroized when
/// the keypair is dropped.
pub struct EphemeralKeypair {
    secret: SecretKey,
    public_key: Bytes,
}

impl EphemeralKeypair {
    pub fn generate() -> Self {
        let secret = generate_secret();
        let public_key = Bytes::from(public_key_bytes(&secret));
        Self { secret, public_key }
    }

    pub fn public_key(&self) -> &Bytes {
        &self.public_key
    }

    /// Open a result sealed to this keypair
    pub fn open(&self, sealed: &SealedBox, aad: &[u8]) -> anyhow::Result<Vec<u8>> {
        sealed.open(&self.secret.to_bytes(), aad)
    }
}

impl fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// EIP-712 domain of the decryption verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl AuthorizationDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: "Decryption".to_string(),
            version: "1".to_string(),
            chain_id,
            verifying_contract,
        }
    }
}

/// Unsigned authorization, ready to hand to an [`AccountSigner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPayload {
    pub domain: AuthorizationDomain,
    pub public_key: Bytes,
    /// Sorted and deduplicated
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

impl AuthorizationPayload {
    pub fn new(
        domain: AuthorizationDomain,
        public_key: &[u8],
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Self {
        let mut contracts = contract_addresses.to_vec();
        contracts.sort();
        contracts.dedup();
        Self {
            domain,
            public_key: Bytes::from(public_key.to_vec()),
            contract_addresses: contracts,
            start_timestamp,
            duration_days,
        }
    }

    pub fn to_typed_data(&self) -> Result<TypedData, BridgeError> {
        let value = serde_json::json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "UserDecryptRequestVerification": [
                    { "name": "publicKey", "type": "bytes" },
                    { "name": "contractAddresses", "type": "address[]" },
                    { "name": "startTimestamp", "type": "uint256" },
                    { "name": "durationDays", "type": "uint256" }
                ]
            },
            "primaryType": AUTHORIZATION_PRIMARY_TYPE,
            "domain": {
                "name": self.domain.name,
                "version": self.domain.version,
                "chainId": self.domain.chain_id,
                "verifyingContract": format!("{:?}", self.domain.verifying_contract)
            },
            "message": {
                "publicKey": format!("0x{}", hex::encode(&self.public_key)),
                "contractAddresses": self
                    .contract_addresses
                    .iter()
                    .map(|a| format!("{:?}", a))
                    .collect::<Vec<_>>(),
                "startTimestamp": self.start_timestamp.to_string(),
                "durationDays": self.duration_days.to_string()
            }
        });

        serde_json::from_value(value)
            .map_err(|e| BridgeError::DecryptionFailed(format!("Invalid authorization payload: {}", e)))
    }

    /// EIP-712 digest the holder signs
    pub fn digest(&self) -> Result<H256, BridgeError> {
        let typed = self.to_typed_data()?;
        typed
            .encode_eip712()
            .map(H256::from)
            .map_err(|e| BridgeError::DecryptionFailed(format!("EIP-712 encoding failed: {}", e)))
    }
}

/// Signed, time-bounded permission to re-encrypt ciphertexts of the listed
/// contracts to `public_key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionAuthorization {
    pub signer: Address,
    pub public_key: Bytes,
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_days: u64,
    pub signature: Bytes,
}

impl DecryptionAuthorization {
    /// First second at which the authorization is no longer valid
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(self.duration_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// `start <= now < start + days`
    pub fn is_valid_at(&self, now: u64) -> bool {
        now >= self.start_timestamp && now < self.expires_at()
    }

    pub fn covers(&self, contract: Address) -> bool {
        self.contract_addresses.contains(&contract)
    }

    pub fn check(&self, now: u64, contract: Address) -> Result<(), BridgeError> {
        if now < self.start_timestamp {
            return Err(BridgeError::AuthorizationNotYetValid {
                starts_at: self.start_timestamp,
            });
        }
        if now >= self.expires_at() {
            return Err(BridgeError::AuthorizationExpired {
                expired_at: self.expires_at(),
            });
        }
        if !self.covers(contract) {
            return Err(BridgeError::ContractNotAuthorized(contract));
        }
        Ok(())
    }

    /// Time left in the window at `now`
    pub fn remaining(&self, now: u64) -> Duration {
        Duration::from_secs(self.expires_at().saturating_sub(now))
    }

    /// Rebuild the payload this authorization signed, under `domain`
    pub fn payload(&self, domain: AuthorizationDomain) -> AuthorizationPayload {
        AuthorizationPayload::new(
            domain,
            &self.public_key,
            &self.contract_addresses,
            self.start_timestamp,
            self.duration_days,
        )
    }

    /// Whether `signature` recovers to `signer` under `domain`
    pub fn verify(&self, domain: AuthorizationDomain) -> Result<bool, BridgeError> {
        let digest = self.payload(domain).digest()?;
        let recovered = recover_signer(&self.signature, digest.as_bytes())
            .map_err(|e| BridgeError::DecryptionFailed(format!("Bad authorization signature: {}", e)))?;
        Ok(recovered == self.signer)
    }
}

/// The holder's signing capability
///
/// Implementations backed by a wallet UI may block until the user responds.
#[async_trait]
pub trait AccountSigner: Send + Sync {
    fn address(&self) -> Address;

    /// 65-byte `r || s || v` signature over the payload's EIP-712 digest
    async fn sign_authorization(&self, payload: &AuthorizationPayload) -> Result<Bytes, BridgeError>;
}

/// [`AccountSigner`] over a local private key
#[derive(Clone)]
pub struct WalletSigner {
    wallet: LocalWallet,
}

impl WalletSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl AccountSigner for WalletSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_authorization(&self, payload: &AuthorizationPayload) -> Result<Bytes, BridgeError> {
        let typed = payload.to_typed_data()?;
        let signature = self
            .wallet
            .sign_typed_data(&typed)
            .await
            .map_err(|e| BridgeError::ProviderError(format!("Wallet signing failed: {}", e)))?;
        Ok(Bytes::from(signature.to_vec()))
    }
}

/// Keypair generation, payload construction and signing for user decryption
#[derive(Clone)]
pub struct AuthorizationSigner {
    service: Arc<dyn EncryptionService>,
}

impl AuthorizationSigner {
    pub fn new(service: Arc<dyn EncryptionService>) -> Self {
        Self { service }
    }

    pub fn generate_keypair(&self) -> EphemeralKeypair {
        self.service.generate_keypair()
    }

    pub fn build_authorization(
        &self,
        public_key: &[u8],
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> AuthorizationPayload {
        self.service
            .build_authorization(public_key, contract_addresses, start_timestamp, duration_days)
    }

    /// Have `signer` sign `payload`
    ///
    /// The returned signature is checked to recover to the signer's address.
    pub async fn sign(
        &self,
        payload: AuthorizationPayload,
        signer: Option<&dyn AccountSigner>,
    ) -> Result<DecryptionAuthorization, BridgeError> {
        let signer = signer.ok_or(BridgeError::SignerUnavailable)?;
        let holder = signer.address();
        debug!(
            "Requesting decryption authorization from {:?} for {} contract(s)",
            holder,
            payload.contract_addresses.len()
        );

        let signature = signer.sign_authorization(&payload).await?;
        if signature.len() != 65 {
            return Err(BridgeError::DecryptionFailed(format!(
                "Signer returned a {}-byte signature",
                signature.len()
            )));
        }

        let digest = payload.digest()?;
        let recovered = recover_signer(&signature, digest.as_bytes())
            .map_err(|e| BridgeError::DecryptionFailed(format!("Bad authorization signature: {}", e)))?;
        if recovered != holder {
            return Err(BridgeError::DecryptionFailed(format!(
                "Authorization signed by {:?}, expected {:?}",
                recovered, holder
            )));
        }

        info!("✍️  Decryption authorization signed by {:?}", holder);
        Ok(DecryptionAuthorization {
            signer: holder,
            public_key: payload.public_key,
            contract_addresses: payload.contract_addresses,
            start_timestamp: payload.start_timestamp,
            duration_days: payload.duration_days,
            signature,
        })
    }
}
