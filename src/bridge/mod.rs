// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Confidential bridge sessions
//!
//! [`BridgeOrchestrator`] is the only entry point callers use: it sequences
//! mint → approve → wrap → unwrap → decrypt per (holder, asset) session on top
//! of the ledger, the encryption service, the oracle and an injected
//! [`SignerProvider`].

pub mod amount;
pub mod orchestrator;
pub mod panel;
pub mod session;
pub mod signer;

pub use amount::{format_units, parse_units};
pub use orchestrator::{ActionOutcome, BridgeAction, BridgeOrchestrator};
pub use panel::{ciphertext_display, AssetPanel, PanelControls, NO_CONFIDENTIAL_BALANCE};
pub use session::{FailureKind, RecoveryNote, Session, SessionKey, SessionState};
pub use signer::{LocalSignerProvider, SignerProvider};
