// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH key agreement between the bridge and the relayer

use confidential_bridge::crypto::{
    derive_shared_key, generate_secret, parse_public_key, public_key_bytes,
};
use k256::elliptic_curve::sec1::ToEncodedPoint;

#[test]
fn test_derive_shared_key_valid() {
    let relayer = generate_secret();
    let bridge = generate_secret();

    let key = derive_shared_key(&public_key_bytes(&bridge), &relayer.to_bytes());
    assert!(key.is_ok(), "ECDH key derivation should succeed");
    assert_eq!(key.unwrap().len(), 32);
}

#[test]
fn test_shared_key_is_symmetric_and_deterministic() {
    let a = generate_secret();
    let b = generate_secret();

    let ab = derive_shared_key(&public_key_bytes(&b), &a.to_bytes()).unwrap();
    let ba = derive_shared_key(&public_key_bytes(&a), &b.to_bytes()).unwrap();
    assert_eq!(ab, ba, "both sides must derive the same key");

    let again = derive_shared_key(&public_key_bytes(&b), &a.to_bytes()).unwrap();
    assert_eq!(ab, again, "derivation should be deterministic");
}

#[test]
fn test_different_peers_give_different_keys() {
    let ours = generate_secret();
    let first = derive_shared_key(&public_key_bytes(&generate_secret()), &ours.to_bytes()).unwrap();
    let second = derive_shared_key(&public_key_bytes(&generate_secret()), &ours.to_bytes()).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_compressed_and_uncompressed_keys_agree() {
    let ours = generate_secret();
    let peer = generate_secret();
    let compressed = public_key_bytes(&peer);
    let uncompressed = peer.public_key().to_encoded_point(false).as_bytes().to_vec();
    assert_eq!(compressed.len(), 33);
    assert_eq!(uncompressed.len(), 65);

    assert_eq!(
        derive_shared_key(&compressed, &ours.to_bytes()).unwrap(),
        derive_shared_key(&uncompressed, &ours.to_bytes()).unwrap()
    );
}

#[test]
fn test_invalid_public_key() {
    let ours = generate_secret().to_bytes();

    assert!(derive_shared_key(&[0u8; 20], &ours).is_err(), "wrong size");

    let mut not_on_curve = vec![0x02];
    not_on_curve.extend_from_slice(&[0xff; 32]);
    assert!(parse_public_key(&not_on_curve).is_err(), "point not on curve");
}

#[test]
fn test_invalid_private_key() {
    let peer = public_key_bytes(&generate_secret());
    let err = derive_shared_key(&peer, &[7u8; 16]).unwrap_err();
    assert!(err.to_string().contains("expected 32 bytes"));
    assert!(derive_shared_key(&peer, &[0u8; 32]).is_err(), "zero scalar");
}
