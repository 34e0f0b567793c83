// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! XChaCha20-Poly1305 AEAD and sealed boxes
//!
//! A [`SealedBox`] is an ephemeral-static ECIES envelope: the sender generates
//! a throwaway secp256k1 key, derives a shared key with the recipient's public
//! key, and encrypts under a random 24-byte nonce.

use anyhow::{anyhow, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::ecdh::{derive_shared_key, generate_secret, public_key_bytes};

pub const NONCE_SIZE: usize = 24;

fn cipher_for(nonce: &[u8], key: &[u8]) -> Result<XChaCha20Poly1305> {
    if nonce.len() != NONCE_SIZE {
        return Err(anyhow!(
            "Invalid nonce size: expected 24 bytes, got {}",
            nonce.len()
        ));
    }
    if key.len() != 32 {
        return Err(anyhow!(
            "Invalid key size: expected 32 bytes, got {}",
            key.len()
        ));
    }
    XChaCha20Poly1305::new_from_slice(key).map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

/// Encrypt `plaintext`, appending the 16-byte tag. Never reuse a nonce under one key.
pub fn encrypt_with_aead(plaintext: &[u8], nonce: &[u8], aad: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(nonce, key)?;
    cipher
        .encrypt(XNonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|e| anyhow!("Encryption failed: {}", e))
}

/// Decrypt and authenticate `ciphertext`; tampered data or a wrong AAD fails
pub fn decrypt_with_aead(ciphertext: &[u8], nonce: &[u8], aad: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(nonce, key)?;
    cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|e| anyhow!("Decryption failed (authentication error): {}", e))
}

/// Ciphertext addressed to one secp256k1 public key. Hex on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedBox {
    pub ephemeral_public_key: String,
    pub nonce: String,
    pub ciphertext: String,
}

impl SealedBox {
    pub fn seal(plaintext: &[u8], recipient_public: &[u8], aad: &[u8]) -> Result<Self> {
        let ephemeral = generate_secret();
        let key = derive_shared_key(recipient_public, &ephemeral.to_bytes())?;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = encrypt_with_aead(plaintext, &nonce, aad, &key)?;

        Ok(Self {
            ephemeral_public_key: hex::encode(public_key_bytes(&ephemeral)),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        })
    }

    pub fn open(&self, recipient_secret: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let sender_public = decode_hex("ephemeralPublicKey", &self.ephemeral_public_key)?;
        let nonce = decode_hex("nonce", &self.nonce)?;
        let ciphertext = decode_hex("ciphertext", &self.ciphertext)?;

        let key = derive_shared_key(&sender_public, recipient_secret)?;
        decrypt_with_aead(&ciphertext, &nonce, aad, &key)
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim_start_matches("0x")).map_err(|e| anyhow!("Invalid hex in {}: {}", field, e))
}
