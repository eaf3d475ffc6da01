//! End-to-end ring-signature scenarios, mirroring the reference test seeds.

use num_bigint::BigUint;
use once_cell::sync::Lazy;
use rsaring::key::{generate_keypair, RsaPrivateKey, RsaPublicKey};
use rsaring::ring::Ring;
use rsaring::{codec, Error};

static E: Lazy<BigUint> = Lazy::new(|| BigUint::from(65537u32));

fn ring_of(sizes: &[u32]) -> (Ring, Vec<RsaPrivateKey>) {
    let mut pks = Vec::with_capacity(sizes.len());
    let mut sks = Vec::with_capacity(sizes.len());

    for &bits in sizes {
        let (pk, sk) = generate_keypair(bits, &E);
        pks.push(pk);
        sks.push(sk);
    }

    (Ring::new(pks), sks)
}

#[test]
fn two_member_ring_signer_index_zero() {
    let (ring, sks) = ring_of(&[512, 512]);

    let sigma = ring.sign(b"hi", 0, &sks[0]).unwrap();
    assert!(ring.verify(b"hi", &sigma).unwrap());
    assert!(!ring.verify(b"Hi", &sigma).unwrap());
}

#[test]
fn three_member_ring_every_signer_index_verifies_and_signatures_differ() {
    let (ring, sks) = ring_of(&[512, 512, 512]);
    let message = b"a common message for every signer";

    let mut signatures = Vec::with_capacity(3);
    for (s, sk) in sks.iter().enumerate() {
        let sigma = ring.sign(message, s, sk).unwrap();
        assert!(ring.verify(message, &sigma).unwrap());
        signatures.push(sigma);
    }

    // No two signer choices should produce the same (v, x_i) tuple -- each
    // sign draws fresh randomness for every non-signer slot and for `v`/`iv`.
    assert_ne!(signatures[0], signatures[1]);
    assert_ne!(signatures[1], signatures[2]);
    assert_ne!(signatures[0], signatures[2]);
}

#[test]
fn signature_on_the_genesis_string() {
    let (ring, sks) = ring_of(&[512, 512, 512]);
    let message =
        b"The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";
    assert_eq!(message.len(), 74);

    let sigma = ring.sign(message, 1, &sks[1]).unwrap();
    assert!(ring.verify(message, &sigma).unwrap());
}

#[test]
fn signer_index_key_mismatch_is_rejected_before_any_rsa_operation() {
    let (ring, sks) = ring_of(&[512, 512]);

    let err = ring.sign(b"hi", 0, &sks[1]).unwrap_err();
    assert!(matches!(err, Error::SignerKeyMismatch(0)));
}

#[test]
fn corrupted_iv_fails_verification() {
    let (ring, sks) = ring_of(&[512, 512]);
    let sigma = ring.sign(b"hi", 0, &sks[0]).unwrap();

    let encoded = codec::encode(&ring, &sigma).unwrap();
    let (parsed_ring, mut parsed_sigma) = codec::parse(&encoded).unwrap();
    parsed_sigma.iv[0] ^= 0x01;

    assert!(!parsed_ring.verify(b"hi", &parsed_sigma).unwrap());
}

#[test]
fn mixed_key_sizes_sign_and_verify_for_every_signer() {
    let (pk1, sk1) = generate_keypair(1024, &E);
    let (pk2, sk2) = generate_keypair(1536, &E);
    let (pk3, sk3) = generate_keypair(1536, &E);

    let ring = Ring::new(vec![pk1, pk2, pk3]);

    assert!(ring.domain_bits() >= 1536 + 160);
    assert_eq!(ring.domain_bits() % 128, 0);

    let message = b"mixed key sizes";
    for (s, sk) in [sk1, sk2, sk3].iter().enumerate() {
        let sigma = ring.sign(message, s, sk).unwrap();
        assert!(ring.verify(message, &sigma).unwrap());
    }
}

#[test]
fn signature_file_round_trips_through_the_wire_format() {
    let (ring, sks) = ring_of(&[512, 512]);
    let sigma = ring.sign(b"round trip", 0, &sks[0]).unwrap();

    let encoded = codec::encode(&ring, &sigma).unwrap();
    let (parsed_ring, parsed_sigma) = codec::parse(&encoded).unwrap();

    assert_eq!(parsed_ring.keys(), ring.keys());
    assert_eq!(parsed_sigma, sigma);
    assert!(parsed_ring
        .verify(b"round trip", &parsed_sigma)
        .unwrap());
}

#[test]
fn wrong_ring_member_is_rejected() {
    let (ring, sks) = ring_of(&[512, 512]);
    let sigma = ring.sign(b"hi", 0, &sks[0]).unwrap();

    let (foreign_pk, _) = generate_keypair(512, &E);
    let mut keys = ring.keys().to_vec();
    keys[1] = foreign_pk;
    let tampered_ring = Ring::new(keys);

    assert!(!tampered_ring.verify(b"hi", &sigma).unwrap());
}

#[test]
fn flipping_any_single_bit_of_the_signature_is_detected() {
    let (ring, sks) = ring_of(&[512, 512, 512]);
    let message = b"tamper detection";
    let sigma = ring.sign(message, 2, &sks[2]).unwrap();
    assert!(ring.verify(message, &sigma).unwrap());

    let mut v_flipped = sigma.clone();
    v_flipped.v = &v_flipped.v ^ &BigUint::from(1u32);
    assert!(!ring.verify(message, &v_flipped).unwrap());

    let mut x_flipped = sigma.clone();
    x_flipped.xs[0] = &x_flipped.xs[0] ^ &BigUint::from(1u32);
    assert!(!ring.verify(message, &x_flipped).unwrap());

    let mut iv_flipped = sigma;
    iv_flipped.iv[0] ^= 0x01;
    assert!(!ring.verify(message, &iv_flipped).unwrap());
}

#[test]
fn keypair_round_trips_through_pem() {
    let (pk, sk) = generate_keypair(512, &E);

    let pk_pem = pk.to_pem().unwrap();
    let parsed_pk = RsaPublicKey::from_pem(&pk_pem).unwrap();
    assert_eq!(parsed_pk, pk);

    let ring = Ring::new(vec![pk, parsed_pk]);
    let sigma = ring.sign(b"pem round trip", 0, &sk).unwrap();
    assert!(ring.verify(b"pem round trip", &sigma).unwrap());
}
