// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory asset ledger
//!
//! Behaves like an automining dev chain hosting a mintable ERC20, its
//! confidential wrapper and the decryption oracle: writes take effect when
//! submitted, `confirm` hands back the receipt, and every submission and
//! confirmation is journaled so tests can check ordering.

use async_trait::async_trait;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256, U64};
use ethers::utils::keccak256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::fhe::CiphertextStore;
use crate::config::AssetDescriptor;
use crate::contracts::events::{DecryptionRequestEvent, UnwrapFinalizedEvent};
use crate::contracts::AssetLedger;
use crate::error::BridgeError;
use crate::fhe::{CiphertextHandle, InputBinding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    Mint,
    Approve,
    Wrap,
    Unwrap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Submitted {
        op: LedgerOp,
        tx_hash: H256,
        caller: Address,
    },
    Confirmed {
        op: LedgerOp,
        tx_hash: H256,
    },
}

/// Failure to inject into the next submission of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Broadcast succeeds, the transaction reverts
    Revert,
    /// Node rejects the request before broadcast
    Unavailable,
}

enum TxFailure {
    Revert(String),
    Rejected(BridgeError),
}

#[derive(Debug, Clone)]
struct PendingUnwrap {
    underlying: Address,
    confidential: Address,
    receiver: Address,
    amount: u64,
}

#[derive(Default)]
struct LedgerState {
    /// (token, holder) → balance
    balances: HashMap<(Address, Address), U256>,
    /// (token, owner, spender) → allowance
    allowances: HashMap<(Address, Address, Address), U256>,
    /// (confidential token, holder) → balance handle
    confidential: HashMap<(Address, Address), CiphertextHandle>,
    receipts: HashMap<H256, (LedgerOp, TransactionReceipt)>,
    pending_unwraps: HashMap<U256, PendingUnwrap>,
    logs: Vec<Log>,
    failures: HashMap<LedgerOp, InjectedFailure>,
    block: u64,
    nonce: u64,
    request_counter: U256,
}

impl LedgerState {
    fn balance(&self, token: Address, holder: Address) -> U256 {
        self.balances.get(&(token, holder)).copied().unwrap_or_default()
    }

    fn credit(&mut self, token: Address, holder: Address, amount: U256) {
        *self.balances.entry((token, holder)).or_default() += amount;
    }

    fn debit(&mut self, token: Address, holder: Address, amount: U256) {
        let balance = self.balances.entry((token, holder)).or_default();
        *balance = balance.saturating_sub(amount);
    }
}

/// Address the mock decryption oracle emits `DecryptionRequest` from
pub fn oracle_address() -> Address {
    Address::repeat_byte(0x0d)
}

pub fn finalize_unwrap_selector() -> [u8; 4] {
    let hash = keccak256(b"finalizeUnwrap(uint256,uint64)");
    [hash[0], hash[1], hash[2], hash[3]]
}

pub struct InMemoryLedger {
    store: Arc<CiphertextStore>,
    state: Arc<RwLock<LedgerState>>,
    journal: Arc<RwLock<Vec<JournalEntry>>>,
    confirm_delay: Duration,
    auto_fulfill: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryLedger {
    pub fn new(store: Arc<CiphertextStore>) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(LedgerState::default())),
            journal: Arc::new(RwLock::new(Vec::new())),
            confirm_delay: Duration::ZERO,
            auto_fulfill: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Every `confirm` waits this long before returning the receipt
    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    /// Whether the oracle calls back as soon as anyone polls for fulfillment
    pub fn set_auto_fulfill(&self, enabled: bool) {
        self.auto_fulfill.store(enabled, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn inject_failure(&self, op: LedgerOp, failure: InjectedFailure) {
        self.state.write().await.failures.insert(op, failure);
    }

    pub fn store(&self) -> Arc<CiphertextStore> {
        self.store.clone()
    }

    pub async fn journal(&self) -> Vec<JournalEntry> {
        self.journal.read().await.clone()
    }

    pub async fn submitted(&self, op: LedgerOp) -> usize {
        self.journal
            .read()
            .await
            .iter()
            .filter(|e| matches!(e, JournalEntry::Submitted { op: o, .. } if *o == op))
            .count()
    }

    pub async fn submissions(&self) -> usize {
        self.journal
            .read()
            .await
            .iter()
            .filter(|e| matches!(e, JournalEntry::Submitted { .. }))
            .count()
    }

    pub async fn logs(&self) -> Vec<Log> {
        self.state.read().await.logs.clone()
    }

    pub async fn decryption_requests(&self) -> Vec<DecryptionRequestEvent> {
        self.state
            .read()
            .await
            .logs
            .iter()
            .filter_map(DecryptionRequestEvent::decode)
            .collect()
    }

    pub async fn allowance(&self, asset: &AssetDescriptor, owner: Address) -> U256 {
        self.state
            .read()
            .await
            .allowances
            .get(&(asset.underlying_address, owner, asset.confidential_address))
            .copied()
            .unwrap_or_default()
    }

    /// Underlying tokens held by the confidential wrapper
    pub async fn wrapper_reserve(&self, asset: &AssetDescriptor) -> U256 {
        self.state
            .read()
            .await
            .balance(asset.underlying_address, asset.confidential_address)
    }

    pub async fn pending_unwraps(&self) -> usize {
        self.state.read().await.pending_unwraps.len()
    }

    /// Run the oracle callback for every outstanding unwrap
    pub async fn fulfill_pending(&self) -> usize {
        let mut state = self.state.write().await;
        let pending: Vec<(U256, PendingUnwrap)> = state.pending_unwraps.drain().collect();
        let count = pending.len();
        for (request_id, unwrap) in pending {
            Self::settle(&mut *state, request_id, unwrap);
        }
        count
    }

    fn settle(state: &mut LedgerState, request_id: U256, unwrap: PendingUnwrap) {
        let amount = U256::from(unwrap.amount);
        state.debit(unwrap.underlying, unwrap.confidential, amount);
        state.credit(unwrap.underlying, unwrap.receiver, amount);
        state.block += 1;

        let mut log = UnwrapFinalizedEvent {
            request_id,
            receiver: unwrap.receiver,
            amount,
        }
        .to_log(unwrap.confidential);
        log.block_number = Some(U64::from(state.block));
        state.logs.push(log);
        debug!("Oracle settled request {} ({} to {:?})", request_id, amount, unwrap.receiver);
    }

    fn ensure_configured(asset: &AssetDescriptor) -> Result<(), BridgeError> {
        if asset.is_configured() {
            Ok(())
        } else {
            Err(BridgeError::ContractsNotConfigured(asset.key.clone()))
        }
    }

    fn ensure_reads(&self) -> Result<(), BridgeError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BridgeError::ProviderError("injected read failure".to_string()));
        }
        Ok(())
    }

    async fn submit<F>(&self, op: LedgerOp, caller: Address, apply: F) -> Result<H256, BridgeError>
    where
        F: FnOnce(&mut LedgerState, &CiphertextStore) -> Result<Vec<Log>, TxFailure>,
    {
        let mut state = self.state.write().await;

        let injected = state.failures.remove(&op);
        if injected == Some(InjectedFailure::Unavailable) {
            return Err(BridgeError::ProviderError(format!("node rejected {:?}", op)));
        }

        let outcome = if injected == Some(InjectedFailure::Revert) {
            Err(TxFailure::Revert("injected revert".to_string()))
        } else {
            apply(&mut *state, &*self.store)
        };
        let (status, logs) = match outcome {
            Ok(logs) => (1u64, logs),
            Err(TxFailure::Revert(reason)) => {
                debug!("{:?} reverted: {}", op, reason);
                (0u64, Vec::new())
            }
            Err(TxFailure::Rejected(err)) => return Err(err),
        };

        state.nonce += 1;
        state.block += 1;
        let tx_hash = H256::from(keccak256(state.nonce.to_be_bytes()));
        let block = U64::from(state.block);

        let logs: Vec<Log> = logs
            .into_iter()
            .enumerate()
            .map(|(i, mut log)| {
                log.transaction_hash = Some(tx_hash);
                log.block_number = Some(block);
                log.log_index = Some(U256::from(i));
                log
            })
            .collect();
        state.logs.extend(logs.iter().cloned());

        let receipt = TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: Some(block),
            from: caller,
            status: Some(U64::from(status)),
            logs,
            ..Default::default()
        };
        state.receipts.insert(tx_hash, (op, receipt));
        drop(state);

        self.journal.write().await.push(JournalEntry::Submitted {
            op,
            tx_hash,
            caller,
        });
        Ok(tx_hash)
    }
}

#[async_trait]
impl AssetLedger for InMemoryLedger {
    async fn balance_of(
        &self,
        asset: &AssetDescriptor,
        holder: Address,
    ) -> Result<U256, BridgeError> {
        Self::ensure_configured(asset)?;
        self.ensure_reads()?;
        Ok(self.state.read().await.balance(asset.underlying_address, holder))
    }

    async fn confidential_balance_of(
        &self,
        asset: &AssetDescriptor,
        holder: Address,
    ) -> Result<CiphertextHandle, BridgeError> {
        Self::ensure_configured(asset)?;
        self.ensure_reads()?;
        Ok(self
            .state
            .read()
            .await
            .confidential
            .get(&(asset.confidential_address, holder))
            .copied()
            .unwrap_or(CiphertextHandle::ZERO))
    }

    async fn mint(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<H256, BridgeError> {
        Self::ensure_configured(asset)?;
        let token = asset.underlying_address;
        self.submit(LedgerOp::Mint, caller, move |state, _| {
            state.credit(token, to, amount);
            Ok(Vec::new())
        })
        .await
    }

    async fn approve(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        spender: Address,
        amount: U256,
    ) -> Result<H256, BridgeError> {
        Self::ensure_configured(asset)?;
        let token = asset.underlying_address;
        self.submit(LedgerOp::Approve, caller, move |state, _| {
            state.allowances.insert((token, caller, spender), amount);
            Ok(Vec::new())
        })
        .await
    }

    async fn wrap(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<H256, BridgeError> {
        Self::ensure_configured(asset)?;
        let underlying = asset.underlying_address;
        let confidential = asset.confidential_address;
        self.submit(LedgerOp::Wrap, caller, move |state, store| {
            let allowance = state
                .allowances
                .get(&(underlying, caller, confidential))
                .copied()
                .unwrap_or_default();
            if allowance < amount {
                return Err(TxFailure::Revert("insufficient allowance".to_string()));
            }
            if state.balance(underlying, caller) < amount {
                return Err(TxFailure::Revert("insufficient balance".to_string()));
            }
            if amount > U256::from(u64::MAX) {
                return Err(TxFailure::Revert("amount overflows uint64".to_string()));
            }

            let current = state
                .confidential
                .get(&(confidential, to))
                .and_then(|h| store.value_of(*h))
                .unwrap_or_default();
            let updated = current
                .checked_add(amount.as_u64())
                .ok_or_else(|| TxFailure::Revert("confidential balance overflow".to_string()))?;

            state.allowances.insert((underlying, caller, confidential), allowance - amount);
            state.debit(underlying, caller, amount);
            state.credit(underlying, confidential, amount);
            state
                .confidential
                .insert((confidential, to), store.fresh(updated, confidential));
            Ok(Vec::new())
        })
        .await
    }

    async fn unwrap(
        &self,
        asset: &AssetDescriptor,
        caller: Address,
        from: Address,
        to: Address,
        handle: CiphertextHandle,
        proof: Bytes,
    ) -> Result<H256, BridgeError> {
        Self::ensure_configured(asset)?;
        let underlying = asset.underlying_address;
        let confidential = asset.confidential_address;
        self.submit(LedgerOp::Unwrap, caller, move |state, store| {
            if caller != from {
                return Err(TxFailure::Revert("caller is not an operator for from".to_string()));
            }
            let binding = InputBinding {
                contract: confidential,
                account: caller,
            };
            let requested = store
                .consume_input(handle, &proof, binding)
                .map_err(TxFailure::Rejected)?;

            let current = state
                .confidential
                .get(&(confidential, from))
                .and_then(|h| store.value_of(*h))
                .unwrap_or_default();
            // encrypted select: an over-sized request burns nothing
            let burnt = if requested <= current { requested } else { 0 };

            state
                .confidential
                .insert((confidential, from), store.fresh(current - burnt, confidential));
            let burnt_handle = store.fresh(burnt, confidential);

            let request_id = state.request_counter;
            state.request_counter += U256::one();
            state.pending_unwraps.insert(
                request_id,
                PendingUnwrap {
                    underlying,
                    confidential,
                    receiver: to,
                    amount: burnt,
                },
            );

            let event = DecryptionRequestEvent {
                counter: request_id,
                request_id,
                handles: vec![burnt_handle],
                contract_caller: confidential,
                callback_selector: finalize_unwrap_selector(),
            };
            Ok(vec![event.to_log(oracle_address())])
        })
        .await
    }

    async fn confirm(&self, tx_hash: H256) -> Result<TransactionReceipt, BridgeError> {
        if !self.confirm_delay.is_zero() {
            tokio::time::sleep(self.confirm_delay).await;
        }

        let (op, receipt) = self
            .state
            .read()
            .await
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| BridgeError::ProviderError(format!("unknown transaction {:?}", tx_hash)))?;

        self.journal
            .write()
            .await
            .push(JournalEntry::Confirmed { op, tx_hash });

        if receipt.status == Some(U64::zero()) {
            return Err(BridgeError::TransactionReverted { tx_hash });
        }
        Ok(receipt)
    }

    async fn unwrap_finalized(
        &self,
        asset: &AssetDescriptor,
        request_id: U256,
        since_block: u64,
    ) -> Result<bool, BridgeError> {
        Self::ensure_configured(asset)?;
        self.ensure_reads()?;

        let mut state = self.state.write().await;
        if self.auto_fulfill.load(Ordering::SeqCst) {
            if let Some(unwrap) = state.pending_unwraps.remove(&request_id) {
                Self::settle(&mut *state, request_id, unwrap);
            }
        }

        Ok(state.logs.iter().any(|log| {
            log.address == asset.confidential_address
                && log.block_number.map(|b| b.as_u64()).unwrap_or_default() >= since_block
                && UnwrapFinalizedEvent::decode(log)
                    .map(|e| e.request_id == request_id)
                    .unwrap_or(false)
        }))
    }
}
