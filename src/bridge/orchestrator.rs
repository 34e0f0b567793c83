// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bridge session state machine
//!
//! ```text
//! Idle ──mint──▶ Minting ──▶ Minted ──wrap──▶ Approving ──▶ Wrapping ──▶ Wrapped
//! Wrapped ──unwrap──▶ BuildingInput ──▶ Unwrapping ──▶ AwaitingOracle ──▶ Wrapped
//! settled ──decrypt──▶ Decrypting ──▶ Decrypted(v)     (zero handle: Decrypted(0))
//! ```
//!
//! Guards run before any write is issued. Every external call is bounded by
//! its configured timeout and by the orchestrator's cancellation token.

use ethers::types::{Address, TransactionReceipt, H256, U256};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock as StdRwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::amount::{ensure_confidential, ensure_positive};
use super::panel::AssetPanel;
use super::session::{
    ActiveSession, FailureKind, RecoveryNote, Session, SessionRegistry, SessionState,
};
use super::signer::SignerProvider;
use crate::cache::{BalanceCache, BalanceSnapshot};
use crate::config::{AssetDescriptor, AssetRegistry, BridgeConfig};
use crate::contracts::events::DecryptionRequestEvent;
use crate::contracts::AssetLedger;
use crate::error::{BridgeError, ErrorCategory};
use crate::fhe::{
    AuthorizationSigner, DecryptionOracleClient, EncryptedInput, EncryptionClient,
    EncryptionService,
};
use crate::utils::{bounded, Clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BridgeAction {
    Mint,
    Wrap,
    Unwrap,
    Decrypt,
    Reset,
}

impl fmt::Display for BridgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeAction::Mint => "mint",
            BridgeAction::Wrap => "wrap",
            BridgeAction::Unwrap => "unwrap",
            BridgeAction::Decrypt => "decrypt",
            BridgeAction::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// What a finished action left behind
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: BridgeAction,
    pub asset: String,
    pub holder: Address,
    pub state: SessionState,
    /// Confirmed transactions, in submission order
    pub transactions: Vec<H256>,
    pub oracle_request: Option<DecryptionRequestEvent>,
    /// `Some(false)` when the oracle callback was not observed in time
    pub fulfilled: Option<bool>,
    pub value: Option<U256>,
    /// Post-action balances; `None` if the refresh failed
    pub balances: Option<BalanceSnapshot>,
}

impl ActionOutcome {
    fn new(action: BridgeAction, asset: &AssetDescriptor, holder: Address, state: SessionState) -> Self {
        Self {
            action,
            asset: asset.key.clone(),
            holder,
            state,
            transactions: Vec::new(),
            oracle_request: None,
            fulfilled: None,
            value: None,
            balances: None,
        }
    }

    /// Last transaction of the action
    pub fn tx_hash(&self) -> Option<H256> {
        self.transactions.last().copied()
    }
}

/// Settled state implied by on-chain balances
fn settled_state_for(snapshot: &BalanceSnapshot) -> SessionState {
    if !snapshot.confidential_handle.is_zero() {
        SessionState::Wrapped
    } else if !snapshot.underlying_balance.is_zero() {
        SessionState::Minted
    } else {
        SessionState::Idle
    }
}

pub struct BridgeOrchestrator {
    config: BridgeConfig,
    assets: AssetRegistry,
    ledger: Arc<dyn AssetLedger>,
    encryption: EncryptionClient,
    authorizer: AuthorizationSigner,
    oracle: DecryptionOracleClient,
    signers: Arc<dyn SignerProvider>,
    clock: Arc<dyn Clock>,
    cache: BalanceCache,
    sessions: SessionRegistry,
    cancel: StdRwLock<CancellationToken>,
}

impl BridgeOrchestrator {
    pub fn new(
        config: BridgeConfig,
        assets: AssetRegistry,
        ledger: Arc<dyn AssetLedger>,
        service: Arc<dyn EncryptionService>,
        signers: Arc<dyn SignerProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let oracle = DecryptionOracleClient::new(
            ledger.clone(),
            service.clone(),
            clock.clone(),
            config.poll_interval(),
        );
        info!(
            "🌉 Bridge ready: {} asset(s), chain {}, busy policy {:?}",
            assets.len(),
            config.chain_id,
            config.busy_policy
        );

        Self {
            encryption: EncryptionClient::new(service.clone()),
            authorizer: AuthorizationSigner::new(service),
            oracle,
            config,
            assets,
            ledger,
            signers,
            clock,
            cache: BalanceCache::new(),
            sessions: SessionRegistry::new(),
            cancel: StdRwLock::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }

    pub fn list_assets(&self) -> Vec<Arc<AssetDescriptor>> {
        self.assets.iter().cloned().collect()
    }

    /// Case-insensitive asset lookup, configured or not
    pub fn asset(&self, key: &str) -> Result<Arc<AssetDescriptor>, BridgeError> {
        self.assets.resolve(key)
    }

    pub fn default_holder(&self) -> Option<Address> {
        self.signers.default_account()
    }

    pub fn service_ready(&self) -> bool {
        self.encryption.is_ready()
    }

    fn token(&self) -> CancellationToken {
        match self.cancel.read() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stop local waiting in every running action
    ///
    /// Broadcast transactions stay broadcast; affected sessions re-read
    /// balances on their next action. Later actions get a fresh token.
    pub fn abandon(&self) {
        let previous = match self.cancel.write() {
            Ok(mut token) => std::mem::replace(&mut *token, CancellationToken::new()),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), CancellationToken::new()),
        };
        previous.cancel();
        warn!("⏹️  Abandoning outstanding bridge actions");
    }

    fn resolve_asset(&self, key: &str) -> Result<Arc<AssetDescriptor>, BridgeError> {
        let asset = self.assets.resolve(key)?;
        if !asset.is_configured() {
            return Err(BridgeError::ContractsNotConfigured(asset.key.clone()));
        }
        Ok(asset)
    }

    async fn refresh(
        &self,
        asset: &AssetDescriptor,
        holder: Address,
        cancel: &CancellationToken,
    ) -> Result<BalanceSnapshot, BridgeError> {
        bounded(
            "balance refresh",
            self.config.timeouts.ledger_call(),
            cancel,
            self.cache.refresh(self.ledger.as_ref(), asset, holder),
        )
        .await
    }

    /// Best-effort post-action refresh; failures are logged, never returned
    async fn refresh_after(
        &self,
        asset: &AssetDescriptor,
        holder: Address,
        counterparties: &[Address],
        cancel: &CancellationToken,
    ) -> Option<BalanceSnapshot> {
        for other in counterparties.iter().filter(|a| **a != holder) {
            self.cache.invalidate(*other, &asset.key).await;
        }
        match self.refresh(asset, holder, cancel).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("⚠️  Balance refresh for {:?}/{} failed: {}", holder, asset.key, e);
                None
            }
        }
    }

    /// Refuse faulted sessions, then re-read balances before any guard runs
    ///
    /// Other holders' actions and out-of-band oracle callbacks move balances
    /// under a session. A settled state the fresh balances contradict is
    /// re-derived; a decrypted value survives only while the handle it was
    /// read from is unchanged.
    async fn prepare(
        &self,
        active: &mut ActiveSession<'_>,
        asset: &AssetDescriptor,
        cancel: &CancellationToken,
    ) -> Result<BalanceSnapshot, BridgeError> {
        let state = active.state();
        if let SessionState::Error(kind) = state {
            return Err(BridgeError::SessionFaulted {
                asset: asset.key.clone(),
                reason: kind.to_string(),
            });
        }

        let holder = active.key().holder;
        let previous = self.cache.get(holder, &asset.key).await;
        let snapshot = self.refresh(asset, holder, cancel).await?;
        Self::settle_on(active, previous.as_ref(), &snapshot);

        if !active.unsettled().is_empty() {
            self.reconcile_unsettled(active, asset, cancel).await;
        }
        Ok(snapshot)
    }

    /// Re-derive the session's settled state from `snapshot` unless the
    /// current one still agrees with it
    fn settle_on(
        active: &mut ActiveSession<'_>,
        previous: Option<&BalanceSnapshot>,
        snapshot: &BalanceSnapshot,
    ) {
        let state = active.state();
        let implied = settled_state_for(snapshot);
        if !active.is_hydrated() || !state.is_settled() {
            active.hydrate(implied);
            return;
        }
        let consistent = match state {
            SessionState::Decrypted(_) => previous
                .map(|p| p.confidential_handle == snapshot.confidential_handle)
                .unwrap_or(false),
            other => other == implied,
        };
        if !consistent {
            debug!("Session {} moved on-chain: {} → {}", active.key(), state, implied);
            active.hydrate(implied);
        }
    }

    /// Drop unwrap requests the oracle has since fulfilled
    async fn reconcile_unsettled(
        &self,
        active: &mut ActiveSession<'_>,
        asset: &AssetDescriptor,
        cancel: &CancellationToken,
    ) {
        for request_id in active.unsettled() {
            let check = bounded(
                "fulfillment check",
                self.config.timeouts.ledger_call(),
                cancel,
                self.ledger.unwrap_finalized(asset, request_id, 0),
            )
            .await;
            match check {
                Ok(true) => {
                    info!("✅ Decryption request {} settled for {}", request_id, asset.symbol);
                    active.settle_request(request_id);
                }
                Ok(false) => debug!("Decryption request {} still pending", request_id),
                Err(e) => warn!("Could not check decryption request {}: {}", request_id, e),
            }
        }
    }

    /// Submit and wait for confirmation; `broadcast` collects the hash as soon
    /// as the submission returns
    async fn transact<F>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        broadcast: &mut Vec<H256>,
        submit: F,
    ) -> Result<TransactionReceipt, BridgeError>
    where
        F: Future<Output = Result<H256, BridgeError>>,
    {
        let tx_hash = bounded(label, self.config.timeouts.ledger_call(), cancel, submit).await?;
        broadcast.push(tx_hash);
        info!("📤 {} submitted: {:?}", label, tx_hash);

        let receipt = bounded(
            &format!("{} confirmation", label),
            self.config.timeouts.confirmation(),
            cancel,
            self.ledger.confirm(tx_hash),
        )
        .await?;
        info!(
            "✅ {} confirmed in block {}",
            label,
            receipt.block_number.map(|b| b.as_u64()).unwrap_or_default()
        );
        Ok(receipt)
    }

    /// Put the session back where it was after a non-contract failure
    fn restore(active: &mut ActiveSession<'_>, prior: SessionState, err: &BridgeError, broadcast: &[H256]) {
        active.transition(prior);
        if err.category() == ErrorCategory::Connectivity && !broadcast.is_empty() {
            // outcome of the broadcast transaction is unknown
            active.mark_stale();
        }
    }

    /// Mint `amount` base units of the underlying token to `to` (default: holder)
    pub async fn mint(
        &self,
        holder: Address,
        asset_key: &str,
        amount: U256,
        to: Option<Address>,
    ) -> Result<ActionOutcome, BridgeError> {
        let asset = self.resolve_asset(asset_key)?;
        ensure_positive(amount)?;
        self.signers.signer_for(holder)?;
        let recipient = to.unwrap_or(holder);

        let cancel = self.token();
        let slot = self.sessions.slot(holder, &asset.key).await;
        let mut active = slot.acquire(self.config.busy_policy).await?;
        self.prepare(&mut active, &asset, &cancel).await?;

        let prior = active.state();
        active.transition(SessionState::Minting);
        info!("🪙 Minting {} {} to {:?}", amount, asset.symbol, recipient);

        let mut broadcast = Vec::new();
        let result = self
            .transact(
                "mint",
                &cancel,
                &mut broadcast,
                self.ledger.mint(&asset, holder, recipient, amount),
            )
            .await;

        if let Err(err) = result {
            if err.category() == ErrorCategory::Contract {
                active.transition(SessionState::Error(FailureKind::MintFailed));
            } else {
                Self::restore(&mut active, prior, &err, &broadcast);
            }
            if !broadcast.is_empty() {
                self.refresh_after(&asset, holder, &[recipient], &cancel).await;
            }
            return Err(err);
        }

        let next = if prior.holds_confidential() {
            SessionState::Wrapped
        } else if recipient == holder {
            SessionState::Minted
        } else {
            prior
        };
        active.transition(next);
        active.clear_recovery();

        let mut outcome = ActionOutcome::new(BridgeAction::Mint, &asset, holder, next);
        outcome.transactions = broadcast;
        outcome.balances = self
            .refresh_after(&asset, holder, &[recipient], &cancel)
            .await;
        Ok(outcome)
    }

    /// Approve the confidential contract, then wrap `amount` into `recipient`'s
    /// confidential balance (default: holder)
    ///
    /// A failure in either step returns the session to the state it started
    /// from with a [`RecoveryNote`]; it never faults the session.
    pub async fn wrap(
        &self,
        holder: Address,
        asset_key: &str,
        amount: U256,
        recipient: Option<Address>,
    ) -> Result<ActionOutcome, BridgeError> {
        let asset = self.resolve_asset(asset_key)?;
        ensure_confidential(amount, self.config.amount_ceiling(), self.config.amount_bits)?;
        self.signers.signer_for(holder)?;
        let to = recipient.unwrap_or(holder);

        let cancel = self.token();
        let slot = self.sessions.slot(holder, &asset.key).await;
        let mut active = slot.acquire(self.config.busy_policy).await?;
        let balances = self.prepare(&mut active, &asset, &cancel).await?;

        let prior = active.state();
        if !matches!(
            prior,
            SessionState::Minted | SessionState::Wrapped | SessionState::Decrypted(_)
        ) {
            return Err(BridgeError::InvalidState {
                action: "wrap",
                state: prior.to_string(),
            });
        }
        let available = balances.underlying_balance;
        if amount > available {
            return Err(BridgeError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        info!("🔒 Wrapping {} {} for {:?}", amount, asset.symbol, to);
        let mut broadcast = Vec::new();
        active.transition(SessionState::Approving);
        let mut result = self
            .transact(
                "approve",
                &cancel,
                &mut broadcast,
                self.ledger
                    .approve(&asset, holder, asset.confidential_address, amount),
            )
            .await
            .map(|_| ());
        if result.is_ok() {
            active.transition(SessionState::Wrapping);
            result = self
                .transact(
                    "wrap",
                    &cancel,
                    &mut broadcast,
                    self.ledger.wrap(&asset, holder, to, amount),
                )
                .await
                .map(|_| ());
        }

        if let Err(err) = result {
            warn!("Wrap of {} {} failed, session recoverable: {}", amount, asset.symbol, err);
            Self::restore(&mut active, prior, &err, &broadcast);
            active.note_recovery(RecoveryNote {
                action: BridgeAction::Wrap.to_string(),
                reason: err.to_string(),
                broadcast: broadcast.clone(),
            });
            if !broadcast.is_empty() {
                self.refresh_after(&asset, holder, &[to], &cancel).await;
            }
            return Err(err);
        }

        let next = if to == holder { SessionState::Wrapped } else { prior };
        active.transition(next);
        active.clear_recovery();

        let mut outcome = ActionOutcome::new(BridgeAction::Wrap, &asset, holder, next);
        outcome.transactions = broadcast;
        outcome.balances = self.refresh_after(&asset, holder, &[to], &cancel).await;
        Ok(outcome)
    }

    /// Burn `amount` from the holder's confidential balance and have the
    /// oracle release it as underlying tokens to `recipient` (default: holder)
    pub async fn unwrap(
        &self,
        holder: Address,
        asset_key: &str,
        amount: U256,
        recipient: Option<Address>,
    ) -> Result<ActionOutcome, BridgeError> {
        let asset = self.resolve_asset(asset_key)?;
        ensure_confidential(amount, self.config.amount_ceiling(), self.config.amount_bits)?;
        if !self.encryption.is_ready() {
            return Err(BridgeError::ServiceUnavailable);
        }
        self.signers.signer_for(holder)?;
        let to = recipient.unwrap_or(holder);

        let cancel = self.token();
        let slot = self.sessions.slot(holder, &asset.key).await;
        let mut active = slot.acquire(self.config.busy_policy).await?;
        self.prepare(&mut active, &asset, &cancel).await?;

        let prior = active.state();
        if !prior.holds_confidential() {
            return Err(BridgeError::InvalidState {
                action: "unwrap",
                state: prior.to_string(),
            });
        }

        info!("🔓 Unwrapping {} {} to {:?}", amount, asset.symbol, to);
        active.transition(SessionState::BuildingInput);
        let input: Result<EncryptedInput, BridgeError> = async {
            let mut builder = self
                .encryption
                .create_input(asset.confidential_address, holder)?;
            builder.add_uint64(amount)?;
            bounded(
                "input encryption",
                self.config.timeouts.encryption(),
                &cancel,
                builder.encrypt(),
            )
            .await
        }
        .await;
        let input = match input {
            Ok(input) => input,
            Err(err) => {
                active.transition(prior);
                return Err(err);
            }
        };

        active.transition(SessionState::Unwrapping);
        let mut broadcast = Vec::new();
        let receipt = match self
            .transact(
                "unwrap",
                &cancel,
                &mut broadcast,
                self.oracle.submit_unwrap(&asset, holder, holder, to, input),
            )
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                if err.category() == ErrorCategory::Contract {
                    active.transition(SessionState::Error(FailureKind::UnwrapFailed));
                } else {
                    Self::restore(&mut active, prior, &err, &broadcast);
                }
                if !broadcast.is_empty() {
                    self.refresh_after(&asset, holder, &[to], &cancel).await;
                }
                return Err(err);
            }
        };

        // the burn is confirmed from here on; the balance handle has moved
        let request = match self.oracle.correlate(&receipt, asset.confidential_address) {
            Ok(request) => request,
            Err(err) => {
                active.transition(SessionState::Wrapped);
                active.mark_stale();
                self.refresh_after(&asset, holder, &[to], &cancel).await;
                return Err(err);
            }
        };
        let request_id = request.request_id;
        active.transition(SessionState::AwaitingOracle { request_id });

        let fulfilled = if self.config.await_fulfillment {
            let since_block = receipt.block_number.map(|b| b.as_u64()).unwrap_or_default();
            match bounded(
                "oracle fulfillment",
                self.config.timeouts.fulfillment(),
                &cancel,
                self.oracle.await_fulfillment(&asset, request_id, since_block),
            )
            .await
            {
                Ok(()) => Some(true),
                Err(BridgeError::Timeout { after, .. }) => {
                    warn!(
                        "Decryption request {} not fulfilled after {:?}; it settles on-chain later",
                        request_id, after
                    );
                    active.push_unsettled(request_id);
                    Some(false)
                }
                Err(err) => {
                    active.push_unsettled(request_id);
                    active.transition(SessionState::Wrapped);
                    self.refresh_after(&asset, holder, &[to], &cancel).await;
                    return Err(err);
                }
            }
        } else {
            active.push_unsettled(request_id);
            None
        };

        active.transition(SessionState::Wrapped);
        active.clear_recovery();

        let mut outcome =
            ActionOutcome::new(BridgeAction::Unwrap, &asset, holder, SessionState::Wrapped);
        outcome.transactions = broadcast;
        outcome.oracle_request = Some(request);
        outcome.fulfilled = fulfilled;
        outcome.balances = self.refresh_after(&asset, holder, &[to], &cancel).await;
        Ok(outcome)
    }

    /// Decrypt the holder's current confidential balance
    ///
    /// A zero handle decrypts to 0 without signing or contacting the oracle.
    /// Otherwise a fresh keypair is generated, an authorization scoped to this
    /// asset's confidential contract is signed, and the oracle resolves the
    /// handle; the keypair is dropped before returning.
    pub async fn decrypt_balance(
        &self,
        holder: Address,
        asset_key: &str,
    ) -> Result<ActionOutcome, BridgeError> {
        let asset = self.resolve_asset(asset_key)?;
        let signer = self.signers.signer_for(holder)?;

        let cancel = self.token();
        let slot = self.sessions.slot(holder, &asset.key).await;
        let mut active = slot.acquire(self.config.busy_policy).await?;
        let snapshot = self.prepare(&mut active, &asset, &cancel).await?;
        let prior = active.state();

        let handle = snapshot.confidential_handle;
        let mut outcome = ActionOutcome::new(BridgeAction::Decrypt, &asset, holder, prior);
        outcome.balances = Some(snapshot);

        if handle.is_zero() {
            debug!("No confidential balance for {:?}/{}", holder, asset.key);
            let state = SessionState::Decrypted(U256::zero());
            active.transition(state);
            outcome.state = state;
            outcome.value = Some(U256::zero());
            return Ok(outcome);
        }
        if !self.encryption.is_ready() {
            return Err(BridgeError::ServiceUnavailable);
        }

        active.transition(SessionState::Decrypting);
        let value: Result<U256, BridgeError> = async {
            let keypair = self.authorizer.generate_keypair();
            let payload = self.authorizer.build_authorization(
                keypair.public_key(),
                &[asset.confidential_address],
                self.clock.now(),
                self.config.authorization_days,
            );
            let authorization = bounded(
                "authorization signing",
                self.config.timeouts.signer(),
                &cancel,
                self.authorizer.sign(payload, Some(signer.as_ref())),
            )
            .await?;

            let values = bounded(
                "oracle resolve",
                self.config.timeouts.oracle(),
                &cancel,
                self.oracle
                    .resolve(&[handle], asset.confidential_address, &authorization, keypair),
            )
            .await?;
            values.get(&handle).copied().ok_or_else(|| {
                BridgeError::DecryptionFailed(format!("No value for {}", handle.short()))
            })
        }
        .await;

        match value {
            Ok(value) => {
                info!("🔓 Decrypted {} balance of {:?}", asset.symbol, holder);
                let state = SessionState::Decrypted(value);
                active.transition(state);
                outcome.state = state;
                outcome.value = Some(value);
                Ok(outcome)
            }
            Err(err) => {
                active.transition(prior);
                Err(err)
            }
        }
    }

    /// Clear a fault or recovery note by re-deriving state from the ledger
    pub async fn reset_session(
        &self,
        holder: Address,
        asset_key: &str,
    ) -> Result<ActionOutcome, BridgeError> {
        let asset = self.resolve_asset(asset_key)?;
        let cancel = self.token();
        let slot = self.sessions.slot(holder, &asset.key).await;
        let mut active = slot.acquire(self.config.busy_policy).await?;

        let snapshot = self.refresh(&asset, holder, &cancel).await?;
        let state = settled_state_for(&snapshot);
        active.hydrate(state);
        active.clear_recovery();
        self.reconcile_unsettled(&mut active, &asset, &cancel).await;
        info!("♻️  Session {} reset to {}", active.key(), state);

        let mut outcome = ActionOutcome::new(BridgeAction::Reset, &asset, holder, state);
        outcome.balances = Some(snapshot);
        Ok(outcome)
    }

    /// Re-read both balances through the owning session, re-derive its
    /// settled state, and settle any unwrap requests the oracle has
    /// fulfilled since
    pub async fn refresh_balances(
        &self,
        holder: Address,
        asset_key: &str,
    ) -> Result<BalanceSnapshot, BridgeError> {
        let asset = self.resolve_asset(asset_key)?;
        let cancel = self.token();
        let slot = self.sessions.slot(holder, &asset.key).await;
        let mut active = slot.acquire(self.config.busy_policy).await?;

        let previous = self.cache.get(holder, &asset.key).await;
        let snapshot = self.refresh(&asset, holder, &cancel).await?;
        if !matches!(active.state(), SessionState::Error(_)) {
            Self::settle_on(&mut active, previous.as_ref(), &snapshot);
        }
        self.reconcile_unsettled(&mut active, &asset, &cancel).await;
        Ok(snapshot)
    }

    pub async fn session_state(&self, holder: Address, asset_key: &str) -> SessionState {
        match self.sessions.existing(holder, asset_key).await {
            Some(slot) => slot.observed(),
            None => SessionState::Idle,
        }
    }

    /// Full session record, `None` while an action is running or if the
    /// session was never touched
    pub async fn session(&self, holder: Address, asset_key: &str) -> Option<Session> {
        self.sessions
            .existing(holder, asset_key)
            .await
            .and_then(|slot| slot.inspect())
    }

    /// One panel per asset for `holder`, from cached balances only
    pub async fn panels(&self, holder: Address) -> Vec<AssetPanel> {
        let service_ready = self.encryption.is_ready();
        let mut panels = Vec::with_capacity(self.assets.len());
        for asset in self.assets.iter() {
            let snapshot = self.cache.get(holder, &asset.key).await;
            let (state, busy) = match self.sessions.existing(holder, &asset.key).await {
                Some(slot) => (slot.observed(), slot.is_busy()),
                None => (SessionState::Idle, false),
            };
            panels.push(AssetPanel::build(
                asset,
                holder,
                snapshot.as_ref(),
                state,
                busy,
                service_ready,
            ));
        }
        panels
    }
}
