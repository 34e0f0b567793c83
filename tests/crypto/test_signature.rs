// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Signer recovery against signatures produced by ethers wallets

use confidential_bridge::crypto::recover_signer;
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::{hash_message, keccak256};

#[tokio::test]
async fn test_recovers_wallet_address() {
    let wallet = LocalWallet::new(&mut rand::thread_rng());
    let message = b"decrypt my balance";

    let signature = wallet.sign_message(message).await.unwrap();
    let digest = hash_message(message);

    let recovered = recover_signer(&signature.to_vec(), digest.as_bytes()).unwrap();
    assert_eq!(recovered, wallet.address());
}

#[tokio::test]
async fn test_raw_recovery_id_accepted() {
    let wallet = LocalWallet::new(&mut rand::thread_rng());
    let digest = hash_message(b"raw v");
    let mut bytes = wallet.sign_message(b"raw v").await.unwrap().to_vec();
    bytes[64] -= 27;

    assert_eq!(recover_signer(&bytes, digest.as_bytes()).unwrap(), wallet.address());
}

#[tokio::test]
async fn test_other_digest_recovers_other_address() {
    let wallet = LocalWallet::new(&mut rand::thread_rng());
    let signature = wallet.sign_message(b"one").await.unwrap().to_vec();
    let other = keccak256(b"two");

    if let Ok(address) = recover_signer(&signature, &other) {
        assert_ne!(address, wallet.address());
    }
}

#[test]
fn test_invalid_sizes() {
    let digest = keccak256(b"x");
    let err = recover_signer(&[0u8; 64], &digest).unwrap_err();
    assert!(err.to_string().contains("expected 65 bytes"));

    let err = recover_signer(&[0u8; 65], &digest[..31]).unwrap_err();
    assert!(err.to_string().contains("expected 32 bytes"));
}

#[test]
fn test_invalid_recovery_id() {
    let digest = keccak256(b"x");
    let mut signature = [1u8; 65];
    signature[64] = 9;
    assert!(recover_signer(&signature, &digest).is_err());
}
