// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! secp256k1 ECDH with HKDF-SHA256 key derivation
//!
//! Used on both directions of the relayer channel: sealing plaintext inputs to
//! the relayer's public key, and opening re-encrypted results addressed to an
//! ephemeral decryption keypair.

use anyhow::{anyhow, Result};
use hkdf::Hkdf;
use k256::{
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
    EncodedPoint, PublicKey, SecretKey,
};
use rand::rngs::OsRng;
use sha2::Sha256;

/// HKDF info string; domain-separates bridge keys from any other use of the curve
const KDF_INFO: &[u8] = b"confidential-bridge/v1";

/// Parse a compressed (33 byte) or uncompressed (65 byte) SEC1 public key
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey> {
    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(anyhow!(
            "Invalid public key size: expected 33 or 65 bytes, got {}",
            bytes.len()
        ));
    }

    let encoded_point =
        EncodedPoint::from_bytes(bytes).map_err(|e| anyhow!("Failed to parse public key: {}", e))?;

    Option::<PublicKey>::from(PublicKey::from_encoded_point(&encoded_point))
        .ok_or_else(|| anyhow!("Invalid public key point"))
}

pub fn generate_secret() -> SecretKey {
    SecretKey::random(&mut OsRng)
}

/// Compressed SEC1 encoding of the public half of `secret`
pub fn public_key_bytes(secret: &SecretKey) -> Vec<u8> {
    secret.public_key().to_encoded_point(true).as_bytes().to_vec()
}

/// Derive a 32-byte symmetric key shared between `secret` and `peer_public`
///
/// Both sides arrive at the same key: `derive(a, B) == derive(b, A)`.
pub fn derive_shared_key(peer_public: &[u8], secret: &[u8]) -> Result<[u8; 32]> {
    if secret.len() != 32 {
        return Err(anyhow!(
            "Invalid private key size: expected 32 bytes, got {}",
            secret.len()
        ));
    }
    let secret =
        SecretKey::from_slice(secret).map_err(|e| anyhow!("Failed to parse private key: {}", e))?;
    let peer = parse_public_key(peer_public)?;

    let shared_secret = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());

    let hkdf = Hkdf::<Sha256>::new(None, shared_secret.raw_secret_bytes());
    let mut derived_key = [0u8; 32];
    hkdf.expand(KDF_INFO, &mut derived_key)
        .map_err(|e| anyhow!("HKDF key derivation failed: {}", e))?;

    Ok(derived_key)
}
