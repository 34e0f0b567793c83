// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-(holder, asset) bridge sessions
//!
//! Each key owns one [`SessionSlot`]. Actions take the slot's gate for their
//! whole run, so actions on one key never interleave, while different keys
//! progress independently. The gate is a FIFO `tokio::sync::Mutex`; under
//! [`BusyPolicy::Reject`] a contended gate fails fast instead of queueing.

use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::info;

use crate::config::BusyPolicy;
use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    MintFailed,
    UnwrapFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MintFailed => write!(f, "MintFailed"),
            FailureKind::UnwrapFailed => write!(f, "UnwrapFailed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Minting,
    Minted,
    Approving,
    Wrapping,
    Wrapped,
    BuildingInput,
    Unwrapping,
    AwaitingOracle { request_id: U256 },
    Decrypting,
    Decrypted(U256),
    Error(FailureKind),
}

impl SessionState {
    /// No action is running against this state
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SessionState::Idle
                | SessionState::Minted
                | SessionState::Wrapped
                | SessionState::Decrypted(_)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Decrypted(_) | SessionState::Error(_))
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, SessionState::Error(_))
    }

    /// Whether the holder is known to have a confidential balance
    pub fn holds_confidential(&self) -> bool {
        match self {
            SessionState::Wrapped => true,
            SessionState::Decrypted(value) => !value.is_zero(),
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Minting => write!(f, "Minting"),
            SessionState::Minted => write!(f, "Minted"),
            SessionState::Approving => write!(f, "Approving"),
            SessionState::Wrapping => write!(f, "Wrapping"),
            SessionState::Wrapped => write!(f, "Wrapped"),
            SessionState::BuildingInput => write!(f, "BuildingInput"),
            SessionState::Unwrapping => write!(f, "Unwrapping"),
            SessionState::AwaitingOracle { request_id } => {
                write!(f, "AwaitingOracle({})", request_id)
            }
            SessionState::Decrypting => write!(f, "Decrypting"),
            SessionState::Decrypted(value) => write!(f, "Decrypted({})", value),
            SessionState::Error(kind) => write!(f, "Error({})", kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub holder: Address,
    pub asset: String,
}

impl SessionKey {
    pub fn new(holder: Address, asset: &str) -> Self {
        Self {
            holder,
            asset: asset.to_lowercase(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{}", self.holder, self.asset)
    }
}

/// A failed action the session recovered from without faulting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryNote {
    pub action: String,
    pub reason: String,
    /// Transactions broadcast before the failure; on-chain state may have moved
    pub broadcast: Vec<H256>,
}

#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    hydrated: bool,
    recovery: Option<RecoveryNote>,
    /// Unwrap requests whose fulfillment was not observed
    unsettled: Vec<U256>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            hydrated: false,
            recovery: None,
            unsettled: Vec::new(),
        }
    }
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn recovery(&self) -> Option<&RecoveryNote> {
        self.recovery.as_ref()
    }

    pub fn unsettled(&self) -> &[U256] {
        &self.unsettled
    }
}

/// Per-key gate plus the state observers see while an action runs
pub struct SessionSlot {
    key: SessionKey,
    gate: Mutex<Session>,
    observed: StdRwLock<SessionState>,
    outstanding: Arc<AtomicUsize>,
}

impl SessionSlot {
    fn new(key: SessionKey) -> Self {
        Self {
            key,
            gate: Mutex::new(Session::default()),
            observed: StdRwLock::new(SessionState::Idle),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Latest published state, readable while an action holds the gate
    pub fn observed(&self) -> SessionState {
        match self.observed.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Copy of the session, or `None` while an action holds the gate
    pub fn inspect(&self) -> Option<Session> {
        self.gate.try_lock().ok().map(|session| session.clone())
    }

    /// An action is running or queued
    pub fn is_busy(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) > 0
    }

    fn publish(&self, state: SessionState) {
        match self.observed.write() {
            Ok(mut observed) => *observed = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }

    /// Take the gate, queueing or failing fast per `policy`
    pub async fn acquire(&self, policy: BusyPolicy) -> Result<ActiveSession<'_>, BridgeError> {
        let ticket = OutstandingTicket::take(self.outstanding.clone());
        let session = match policy {
            BusyPolicy::Queue => self.gate.lock().await,
            BusyPolicy::Reject => self.gate.try_lock().map_err(|_| BridgeError::SessionBusy {
                asset: self.key.asset.clone(),
            })?,
        };
        Ok(ActiveSession {
            slot: self,
            session,
            _ticket: ticket,
        })
    }
}

/// Counts one queued-or-running action until dropped
struct OutstandingTicket(Arc<AtomicUsize>);

impl OutstandingTicket {
    fn take(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for OutstandingTicket {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Exclusive access to one session for the length of an action
pub struct ActiveSession<'a> {
    slot: &'a SessionSlot,
    session: MutexGuard<'a, Session>,
    _ticket: OutstandingTicket,
}

impl ActiveSession<'_> {
    pub fn key(&self) -> &SessionKey {
        &self.slot.key
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn is_hydrated(&self) -> bool {
        self.session.hydrated
    }

    pub fn recovery(&self) -> Option<&RecoveryNote> {
        self.session.recovery.as_ref()
    }

    pub fn unsettled(&self) -> Vec<U256> {
        self.session.unsettled.clone()
    }

    pub fn transition(&mut self, next: SessionState) {
        let previous = self.session.state;
        if previous != next {
            info!("🔄 Session {}: {} → {}", self.slot.key, previous, next);
        }
        self.session.state = next;
        self.slot.publish(next);
    }

    /// Settle on `state` derived from fresh ledger reads
    pub fn hydrate(&mut self, state: SessionState) {
        self.session.hydrated = true;
        self.transition(state);
    }

    /// Force the next action to re-read balances first
    pub fn mark_stale(&mut self) {
        self.session.hydrated = false;
    }

    pub fn note_recovery(&mut self, note: RecoveryNote) {
        self.session.recovery = Some(note);
    }

    pub fn clear_recovery(&mut self) {
        self.session.recovery = None;
    }

    pub fn push_unsettled(&mut self, request_id: U256) {
        self.session.unsettled.push(request_id);
    }

    pub fn settle_request(&mut self, request_id: U256) {
        self.session.unsettled.retain(|id| *id != request_id);
    }
}

/// All sessions this process has touched
#[derive(Clone, Default)]
pub struct SessionRegistry {
    slots: Arc<RwLock<HashMap<SessionKey, Arc<SessionSlot>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn slot(&self, holder: Address, asset: &str) -> Arc<SessionSlot> {
        let key = SessionKey::new(holder, asset);
        if let Some(slot) = self.slots.read().await.get(&key) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(key.clone())
            .or_insert_with(|| Arc::new(SessionSlot::new(key)))
            .clone()
    }

    pub async fn existing(&self, holder: Address, asset: &str) -> Option<Arc<SessionSlot>> {
        self.slots
            .read()
            .await
            .get(&SessionKey::new(holder, asset))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}
