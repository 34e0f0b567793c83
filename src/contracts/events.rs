// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Log decoding for the events the bridge consumes
//!
//! `DecryptionRequest` is emitted by the decryption oracle inside the `unwrap`
//! transaction; `UnwrapFinalized` by the confidential token once the oracle
//! has called back. Decoding never panics: anything that does not match the
//! expected layout yields `None` so callers can skip unrelated logs.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, Log, H256, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};

use crate::fhe::types::CiphertextHandle;

pub const DECRYPTION_REQUEST_SIGNATURE: &str =
    "DecryptionRequest(uint256,uint256,bytes32[],address,bytes4)";

pub const UNWRAP_FINALIZED_SIGNATURE: &str = "UnwrapFinalized(uint256,address,uint256)";

pub fn decryption_request_topic() -> H256 {
    H256::from(keccak256(DECRYPTION_REQUEST_SIGNATURE.as_bytes()))
}

pub fn unwrap_finalized_topic() -> H256 {
    H256::from(keccak256(UNWRAP_FINALIZED_SIGNATURE.as_bytes()))
}

pub(crate) fn u256_topic(value: U256) -> H256 {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    H256::from(buf)
}

pub(crate) fn address_topic(address: Address) -> H256 {
    H256::from(address)
}

/// Oracle decryption request raised by an `unwrap` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequestEvent {
    pub counter: U256,
    pub request_id: U256,
    pub handles: Vec<CiphertextHandle>,
    pub contract_caller: Address,
    pub callback_selector: [u8; 4],
}

impl DecryptionRequestEvent {
    pub fn decode(log: &Log) -> Option<Self> {
        if log.topics.len() != 2 || log.topics[0] != decryption_request_topic() {
            return None;
        }
        let counter = U256::from_big_endian(log.topics[1].as_bytes());

        let tokens = abi::decode(
            &[
                ParamType::Uint(256),
                ParamType::Array(Box::new(ParamType::FixedBytes(32))),
                ParamType::Address,
                ParamType::FixedBytes(4),
            ],
            &log.data,
        )
        .ok()?;

        let mut tokens = tokens.into_iter();
        let request_id = tokens.next()?.into_uint()?;
        let handles = tokens
            .next()?
            .into_array()?
            .into_iter()
            .map(|t| {
                let raw = t.into_fixed_bytes()?;
                <[u8; 32]>::try_from(raw.as_slice()).ok().map(CiphertextHandle)
            })
            .collect::<Option<Vec<_>>>()?;
        let contract_caller = tokens.next()?.into_address()?;
        let selector = tokens.next()?.into_fixed_bytes()?;
        let callback_selector = <[u8; 4]>::try_from(selector.as_slice()).ok()?;

        Some(Self {
            counter,
            request_id,
            handles,
            contract_caller,
            callback_selector,
        })
    }

    /// Encode as the oracle would emit it from `emitter`
    pub fn to_log(&self, emitter: Address) -> Log {
        let data = abi::encode(&[
            Token::Uint(self.request_id),
            Token::Array(
                self.handles
                    .iter()
                    .map(|h| Token::FixedBytes(h.0.to_vec()))
                    .collect(),
            ),
            Token::Address(self.contract_caller),
            Token::FixedBytes(self.callback_selector.to_vec()),
        ]);
        Log {
            address: emitter,
            topics: vec![decryption_request_topic(), u256_topic(self.counter)],
            data: Bytes::from(data),
            ..Default::default()
        }
    }
}

/// Callback confirmation that an unwrap request settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwrapFinalizedEvent {
    pub request_id: U256,
    pub receiver: Address,
    pub amount: U256,
}

impl UnwrapFinalizedEvent {
    pub fn decode(log: &Log) -> Option<Self> {
        if log.topics.len() != 3 || log.topics[0] != unwrap_finalized_topic() {
            return None;
        }
        let request_id = U256::from_big_endian(log.topics[1].as_bytes());
        let receiver = Address::from(log.topics[2]);
        let amount = abi::decode(&[ParamType::Uint(256)], &log.data)
            .ok()?
            .into_iter()
            .next()?
            .into_uint()?;
        Some(Self {
            request_id,
            receiver,
            amount,
        })
    }

    pub fn to_log(&self, emitter: Address) -> Log {
        Log {
            address: emitter,
            topics: vec![
                unwrap_finalized_topic(),
                u256_topic(self.request_id),
                address_topic(self.receiver),
            ],
            data: Bytes::from(abi::encode(&[Token::Uint(self.amount)])),
            ..Default::default()
        }
    }
}
