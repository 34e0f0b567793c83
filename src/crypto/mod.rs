// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cryptographic primitives for the relayer channel and authorization checks
//!
//! - **ECDH**: secp256k1 key agreement, HKDF-SHA256 derived keys
//! - **Encryption**: XChaCha20-Poly1305 AEAD and ECIES-style sealed boxes
//! - **Signature**: ECDSA signer recovery for EIP-712 authorizations
//!
//! Private keys handled here are ephemeral and live in memory only.

pub mod ecdh;
pub mod encryption;
pub mod signature;

pub use ecdh::{derive_shared_key, generate_secret, parse_public_key, public_key_bytes};
pub use encryption::{decrypt_with_aead, encrypt_with_aead, SealedBox};
pub use signature::{address_of, recover_signer};
