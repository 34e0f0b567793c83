// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::keccak256;
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::BridgeError;
use crate::fhe::{
    AuthorizationDomain, CiphertextHandle, DecryptionAuthorization, EncryptedInput,
    EncryptionService, EphemeralKeypair, InputBinding,
};

#[derive(Debug, Clone)]
struct Ciphertext {
    value: u64,
    contract: Address,
    input: Option<InputRecord>,
}

#[derive(Debug, Clone)]
struct InputRecord {
    binding: InputBinding,
    proof: Bytes,
    consumed: bool,
}

/// Plaintext behind every handle the test doubles hand out
///
/// Shared by [`MockEncryptionService`] and the in-memory ledger so that
/// ledger-produced balance handles can be resolved by the mock oracle.
#[derive(Default)]
pub struct CiphertextStore {
    entries: Mutex<HashMap<CiphertextHandle, Ciphertext>>,
}

impl CiphertextStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn random_handle() -> CiphertextHandle {
        loop {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            let handle = CiphertextHandle(bytes);
            if !handle.is_zero() {
                return handle;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CiphertextHandle, Ciphertext>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// New ciphertext of `value` held by `contract`
    pub fn fresh(&self, value: u64, contract: Address) -> CiphertextHandle {
        let handle = Self::random_handle();
        self.lock().insert(
            handle,
            Ciphertext {
                value,
                contract,
                input: None,
            },
        );
        handle
    }

    fn register_input(&self, value: u64, binding: InputBinding) -> CiphertextHandle {
        let handle = Self::random_handle();
        self.lock().insert(
            handle,
            Ciphertext {
                value,
                contract: binding.contract,
                input: Some(InputRecord {
                    binding,
                    proof: Bytes::default(),
                    consumed: false,
                }),
            },
        );
        handle
    }

    fn attach_proof(&self, handles: &[CiphertextHandle], proof: &Bytes) {
        let mut entries = self.lock();
        for handle in handles {
            if let Some(record) = entries.get_mut(handle).and_then(|c| c.input.as_mut()) {
                record.proof = proof.clone();
            }
        }
    }

    /// Zero handle reads as 0
    pub fn value_of(&self, handle: CiphertextHandle) -> Option<u64> {
        if handle.is_zero() {
            return Some(0);
        }
        self.lock().get(&handle).map(|c| c.value)
    }

    pub fn contract_of(&self, handle: CiphertextHandle) -> Option<Address> {
        self.lock().get(&handle).map(|c| c.contract)
    }

    /// Verify and burn an encrypted input the way the input verifier would
    pub fn consume_input(
        &self,
        handle: CiphertextHandle,
        proof: &Bytes,
        binding: InputBinding,
    ) -> Result<u64, BridgeError> {
        let mut entries = self.lock();
        let ciphertext = entries
            .get_mut(&handle)
            .ok_or_else(|| BridgeError::ContractCallFailed("unknown input handle".to_string()))?;
        let value = ciphertext.value;
        let record = ciphertext
            .input
            .as_mut()
            .ok_or_else(|| BridgeError::ContractCallFailed("handle is not an input".to_string()))?;

        if record.binding != binding {
            return Err(BridgeError::InputBindingMismatch {
                contract: record.binding.contract,
                account: record.binding.account,
            });
        }
        if &record.proof != proof {
            return Err(BridgeError::ContractCallFailed("invalid input proof".to_string()));
        }
        if record.consumed {
            return Err(BridgeError::InputAlreadyConsumed);
        }
        record.consumed = true;
        Ok(value)
    }
}

/// Proof over every handle of one input and the pair it is bound to
fn input_proof(handles: &[CiphertextHandle], binding: &InputBinding) -> Bytes {
    let mut preimage = Vec::with_capacity(handles.len() * 32 + 40);
    for handle in handles {
        preimage.extend_from_slice(handle.as_bytes());
    }
    preimage.extend_from_slice(binding.contract.as_bytes());
    preimage.extend_from_slice(binding.account.as_bytes());
    Bytes::from(keccak256(preimage).to_vec())
}

/// In-memory [`EncryptionService`] with call counters and failure switches
pub struct MockEncryptionService {
    store: Arc<CiphertextStore>,
    domain: AuthorizationDomain,
    ready: AtomicBool,
    fail_resolve: AtomicBool,
    resolve_delay_ms: AtomicU64,
    encrypt_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
    seen_public_keys: Mutex<Vec<Bytes>>,
}

impl MockEncryptionService {
    pub fn new(store: Arc<CiphertextStore>, domain: AuthorizationDomain) -> Self {
        Self {
            store,
            domain,
            ready: AtomicBool::new(true),
            fail_resolve: AtomicBool::new(false),
            resolve_delay_ms: AtomicU64::new(0),
            encrypt_calls: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
            seen_public_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }

    pub fn set_resolve_delay(&self, delay: Duration) {
        self.resolve_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Ephemeral public keys of every resolve request, in arrival order
    pub fn seen_public_keys(&self) -> Vec<Bytes> {
        self.seen_public_keys
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl EncryptionService for MockEncryptionService {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn domain(&self) -> AuthorizationDomain {
        self.domain.clone()
    }

    async fn encrypt(
        &self,
        binding: InputBinding,
        values: &[u64],
    ) -> Result<EncryptedInput, BridgeError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_ready() {
            return Err(BridgeError::ServiceUnavailable);
        }

        let handles: Vec<CiphertextHandle> = values
            .iter()
            .map(|value| self.store.register_input(*value, binding))
            .collect();
        let proof = input_proof(&handles, &binding);
        self.store.attach_proof(&handles, &proof);

        Ok(EncryptedInput {
            handles,
            proof,
            binding,
        })
    }

    async fn resolve(
        &self,
        handles: &[CiphertextHandle],
        authorization: &DecryptionAuthorization,
        keypair: &EphemeralKeypair,
    ) -> Result<HashMap<CiphertextHandle, U256>, BridgeError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_public_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(authorization.public_key.clone());

        let delay = self.resolve_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(BridgeError::DecryptionFailed("oracle rejected the request".to_string()));
        }
        if keypair.public_key() != &authorization.public_key {
            return Err(BridgeError::DecryptionFailed(
                "keypair does not match the authorization".to_string(),
            ));
        }
        if !authorization.verify(self.domain.clone())? {
            return Err(BridgeError::DecryptionFailed(
                "authorization signature does not match user".to_string(),
            ));
        }

        let mut values = HashMap::new();
        for handle in handles {
            let contract = self.store.contract_of(*handle).ok_or_else(|| {
                BridgeError::DecryptionFailed(format!("unknown handle {}", handle.short()))
            })?;
            if !authorization.covers(contract) {
                return Err(BridgeError::ContractNotAuthorized(contract));
            }
            let value = self.store.value_of(*handle).unwrap_or_default();
            values.insert(*handle, U256::from(value));
        }
        Ok(values)
    }
}
