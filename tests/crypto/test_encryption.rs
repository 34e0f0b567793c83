// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AEAD and sealed-box behaviour seen from outside the crate

use confidential_bridge::crypto::encryption::NONCE_SIZE;
use confidential_bridge::crypto::{
    decrypt_with_aead, encrypt_with_aead, generate_secret, public_key_bytes, SealedBox,
};
use rand::RngCore;

fn random<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    rand::thread_rng().fill_bytes(&mut out);
    out
}

#[test]
fn test_encrypt_decrypt_with_aad() {
    let key = random::<32>();
    let nonce = random::<NONCE_SIZE>();
    let aad = b"unwrap:31337";

    let ciphertext = encrypt_with_aead(b"42", &nonce, aad, &key).unwrap();
    assert_eq!(ciphertext.len(), 2 + 16, "plaintext plus tag");
    assert_eq!(decrypt_with_aead(&ciphertext, &nonce, aad, &key).unwrap(), b"42");
}

#[test]
fn test_wrong_aad_or_key_fails() {
    let key = random::<32>();
    let nonce = random::<NONCE_SIZE>();
    let ciphertext = encrypt_with_aead(b"balance", &nonce, b"a", &key).unwrap();

    assert!(decrypt_with_aead(&ciphertext, &nonce, b"b", &key).is_err());
    assert!(decrypt_with_aead(&ciphertext, &nonce, b"a", &random::<32>()).is_err());
}

#[test]
fn test_tampered_ciphertext_fails() {
    let key = random::<32>();
    let nonce = random::<NONCE_SIZE>();
    let mut ciphertext = encrypt_with_aead(b"balance", &nonce, &[], &key).unwrap();
    ciphertext[0] ^= 0x01;

    let err = decrypt_with_aead(&ciphertext, &nonce, &[], &key).unwrap_err();
    assert!(err.to_string().contains("authentication"));
}

#[test]
fn test_invalid_nonce_and_key_sizes() {
    let key = random::<32>();
    assert!(encrypt_with_aead(b"x", &[0u8; 12], &[], &key).is_err());
    assert!(encrypt_with_aead(b"x", &random::<NONCE_SIZE>(), &[], &[0u8; 16]).is_err());
}

#[test]
fn test_sealed_box_round_trip() {
    let recipient = generate_secret();
    let sealed = SealedBox::seal(b"1000", &public_key_bytes(&recipient), b"ctx").unwrap();

    assert_eq!(sealed.open(&recipient.to_bytes(), b"ctx").unwrap(), b"1000");
    assert!(sealed.open(&recipient.to_bytes(), b"other").is_err());
    assert!(sealed.open(&generate_secret().to_bytes(), b"ctx").is_err());
}

#[test]
fn test_sealing_twice_differs() {
    let recipient = public_key_bytes(&generate_secret());
    let a = SealedBox::seal(b"same", &recipient, &[]).unwrap();
    let b = SealedBox::seal(b"same", &recipient, &[]).unwrap();
    assert_ne!(a.ephemeral_public_key, b.ephemeral_public_key);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn test_sealed_box_json_is_camel_case_hex() {
    let sealed = SealedBox::seal(b"v", &public_key_bytes(&generate_secret()), &[]).unwrap();
    let json = serde_json::to_value(&sealed).unwrap();
    let nonce = json["nonce"].as_str().unwrap();
    assert_eq!(nonce.len(), NONCE_SIZE * 2);
    assert!(json["ephemeralPublicKey"].as_str().is_some());

    let back: SealedBox = serde_json::from_value(json).unwrap();
    assert_eq!(back, sealed);
}
