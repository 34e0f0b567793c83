// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, Bytes, H256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque 32-byte on-chain reference to an encrypted value
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    /// All-zero sentinel: the holder never wrapped anything
    pub const ZERO: CiphertextHandle = CiphertextHandle([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Shortened form for status lines, `0x12345678…abcdef`
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}…{}", &full[..10], &full[full.len() - 6..])
    }
}

impl From<[u8; 32]> for CiphertextHandle {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<H256> for CiphertextHandle {
    fn from(hash: H256) -> Self {
        Self(hash.0)
    }
}

impl From<CiphertextHandle> for H256 {
    fn from(handle: CiphertextHandle) -> Self {
        H256(handle.0)
    }
}

impl FromStr for CiphertextHandle {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut out)?;
        Ok(Self(out))
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", self.short())
    }
}

/// The (contract, account) pair an encrypted input is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputBinding {
    pub contract: Address,
    pub account: Address,
}

/// Ciphertext handles plus the single proof covering all of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<CiphertextHandle>,
    pub proof: Bytes,
    pub binding: InputBinding,
}

impl EncryptedInput {
    /// Handle of the first encrypted value
    pub fn first_handle(&self) -> Option<CiphertextHandle> {
        self.handles.first().copied()
    }
}
