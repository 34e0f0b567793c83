// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bridge Error Types
//!
//! Every fallible bridge operation returns [`BridgeError`]. Variants are grouped
//! into four categories which decide how a session reacts:
//!
//! - **Validation**: rejected before any external call, session untouched
//! - **Connectivity**: signer/encryption service/provider unreachable, retryable
//! - **Contract**: a transaction reverted or failed after broadcast
//! - **Oracle**: request correlation or off-chain decryption failed

use ethers::types::{Address, H256, U256};
use std::time::Duration;

/// Coarse error classes used by the orchestrator's recovery rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Connectivity,
    Contract,
    Oracle,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    // ----- validation -----
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount {amount} exceeds the {bits}-bit confidential limit")]
    AmountOutOfRange { amount: U256, bits: u32 },

    #[error("Value {0} is outside the uint64 range")]
    RangeError(U256),

    #[error("Insufficient underlying balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Unsupported token {0}. Use zama, usdc, or eth.")]
    UnknownAsset(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Cannot {action} while session is {state}")]
    InvalidState { action: &'static str, state: String },

    #[error("Session for {asset} already has an action outstanding")]
    SessionBusy { asset: String },

    #[error("Session for {asset} is faulted ({reason}); reset it before retrying")]
    SessionFaulted { asset: String, reason: String },

    #[error("Encrypted input bound to ({contract:?}, {account:?}) cannot be used here")]
    InputBindingMismatch { contract: Address, account: Address },

    #[error("Encrypted input was already submitted and cannot be reused")]
    InputAlreadyConsumed,

    // ----- connectivity -----
    #[error("No signer is bound")]
    SignerUnavailable,

    #[error("Encryption service is still initializing")]
    ServiceUnavailable,

    #[error("Contracts for {0} are not configured")]
    ContractsNotConfigured(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("{0} abandoned locally")]
    Abandoned(String),

    // ----- contract -----
    #[error("Transaction {tx_hash:?} reverted")]
    TransactionReverted { tx_hash: H256 },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Contract call failed: {0}")]
    ContractCallFailed(String),

    // ----- oracle -----
    #[error("No DecryptionRequest from {expected:?} in transaction {tx_hash:?}")]
    OracleRequestNotFound { tx_hash: H256, expected: Address },

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Decryption authorization expired at {expired_at}")]
    AuthorizationExpired { expired_at: u64 },

    #[error("Decryption authorization is not valid before {starts_at}")]
    AuthorizationNotYetValid { starts_at: u64 },

    #[error("Decryption authorization does not cover contract {0:?}")]
    ContractNotAuthorized(Address),

    #[error("Holder declined to sign the decryption authorization")]
    AuthorizationDeclined,
}

impl BridgeError {
    pub fn category(&self) -> ErrorCategory {
        use BridgeError::*;
        match self {
            InvalidAmount(_)
            | AmountOutOfRange { .. }
            | RangeError(_)
            | InsufficientBalance { .. }
            | UnknownAsset(_)
            | InvalidAddress(_)
            | InvalidState { .. }
            | SessionBusy { .. }
            | SessionFaulted { .. }
            | InputBindingMismatch { .. }
            | InputAlreadyConsumed => ErrorCategory::Validation,
            SignerUnavailable
            | ServiceUnavailable
            | ContractsNotConfigured(_)
            | ProviderError(_)
            | Timeout { .. }
            | Abandoned(_) => ErrorCategory::Connectivity,
            TransactionReverted { .. } | TransactionFailed(_) | ContractCallFailed(_) => {
                ErrorCategory::Contract
            }
            OracleRequestNotFound { .. }
            | DecryptionFailed(_)
            | AuthorizationExpired { .. }
            | AuthorizationNotYetValid { .. }
            | ContractNotAuthorized(_)
            | AuthorizationDeclined => ErrorCategory::Oracle,
        }
    }

    /// Whether re-invoking the same action may succeed without the caller
    /// first refreshing balances
    pub fn is_retryable(&self) -> bool {
        match self.category() {
            ErrorCategory::Connectivity | ErrorCategory::Oracle => true,
            ErrorCategory::Contract => false,
            ErrorCategory::Validation => matches!(self, BridgeError::SessionBusy { .. }),
        }
    }
}

impl From<ethers::providers::ProviderError> for BridgeError {
    fn from(err: ethers::providers::ProviderError) -> Self {
        BridgeError::ProviderError(err.to_string())
    }
}

impl<M: ethers::providers::Middleware> From<ethers::contract::ContractError<M>> for BridgeError {
    fn from(err: ethers::contract::ContractError<M>) -> Self {
        if err.is_revert() {
            BridgeError::ContractCallFailed(err.to_string())
        } else {
            BridgeError::ProviderError(err.to_string())
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            BridgeError::ProviderError(format!("relayer unreachable: {}", err))
        } else {
            BridgeError::DecryptionFailed(format!("relayer error: {}", err))
        }
    }
}
