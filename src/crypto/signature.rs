// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDSA signer recovery for 65-byte `r || s || v` signatures

use anyhow::{anyhow, Result};
use ethers::types::Address;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use tiny_keccak::{Hasher, Keccak};

/// Ethereum address of an uncompressed-able verifying key
pub fn address_of(key: &VerifyingKey) -> Address {
    let public_key = key.to_encoded_point(false);

    let mut hasher = Keccak::v256();
    let mut hash = [0u8; 32];
    hasher.update(&public_key.as_bytes()[1..]);
    hasher.finalize(&mut hash);

    Address::from_slice(&hash[12..])
}

/// Recover the address that produced `signature` over the 32-byte `digest`
///
/// Accepts both raw (0/1) and Ethereum-style (27/28) recovery ids.
pub fn recover_signer(signature: &[u8], digest: &[u8]) -> Result<Address> {
    if signature.len() != 65 {
        return Err(anyhow!(
            "Invalid signature size: expected 65 bytes, got {}",
            signature.len()
        ));
    }
    if digest.len() != 32 {
        return Err(anyhow!(
            "Invalid digest size: expected 32 bytes, got {}",
            digest.len()
        ));
    }

    let mut v = signature[64];
    if v >= 27 {
        v -= 27;
    }
    let recovery_id =
        RecoveryId::try_from(v).map_err(|e| anyhow!("Invalid recovery ID {}: {}", v, e))?;
    let signature = Signature::try_from(&signature[..64])
        .map_err(|e| anyhow!("Failed to parse signature: {}", e))?;

    let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|e| anyhow!("Failed to recover public key: {}", e))?;

    Ok(address_of(&verifying_key))
}
