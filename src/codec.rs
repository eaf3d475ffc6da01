//! The wire format for a signature file — the ring's PEM public keys in
//! order, followed by one trailing line carrying the base64-concatenated
//! `v, x_0, .., x_{r-1}, iv`.
//!
//! Integer width: rather than the reference's wasteful fixed 1024-byte
//! buffer, each integer
//! is encoded in the smallest width that (a) covers `b` bits and (b) is
//! congruent to 1 mod 3, so its base64 encoding always carries exactly two
//! `=` padding characters. `iv` is always 16 bytes, which is already
//! congruent to 1 mod 3. That invariant is what lets the parser split the
//! trailing line on the literal substring `==`, exactly as the reference
//! implementation does.

use num_bigint::BigUint;

use crate::error::{CodecError, Error};
use crate::key::RsaPublicKey;
use crate::ring::{Ring, Signature};

/// Smallest byte width `L` such that `8*L >= bits` and `L % 3 == 1`.
///
/// The `% 3 == 1` constraint keeps every base64-encoded integer's padding at
/// exactly `==`, which is what makes splitting the trailing line on `==`
/// unambiguous.
fn int_width(bits: u64) -> usize {
    let mut l = ((bits + 7) / 8) as usize;
    while l % 3 != 1 {
        l += 1;
    }
    l
}

fn encode_biguint(x: &BigUint, width: usize) -> String {
    let raw = x.to_bytes_be();
    assert!(raw.len() <= width, "int_width computed too small for value");

    let mut buf = vec![0u8; width];
    buf[width - raw.len()..].copy_from_slice(&raw);

    base64::encode(buf)
}

/// Encode `(ring, sigma)` into the on-wire signature file format: the ring's
/// PEM public keys in order, then one trailing base64 line.
pub fn encode(ring: &Ring, sigma: &Signature) -> Result<String, Error> {
    let mut out = String::new();

    for key in ring.keys() {
        out.push_str(&key.to_pem()?);
    }

    let width = int_width(ring.domain_bits());

    out.push_str(&encode_biguint(&sigma.v, width));
    for x in &sigma.xs {
        out.push_str(&encode_biguint(x, width));
    }
    out.push_str(&base64::encode(sigma.iv));
    out.push('\n');

    Ok(out)
}

/// Parse a signature file back into its ring and signature.
///
/// PEM `PUBLIC KEY` blocks are read until a line that doesn't belong to one
/// is seen; everything after that is the trailing line, split on the literal
/// substring `==`.
pub fn parse(contents: &str) -> Result<(Ring, Signature), Error> {
    let (pem_blocks, trailer) = split_ring_and_trailer(contents);

    if pem_blocks.is_empty() {
        return Err(CodecError::NoRingKeys.into());
    }
    if pem_blocks.len() < 2 {
        return Err(CodecError::RingTooSmall(pem_blocks.len()).into());
    }

    let keys: Vec<RsaPublicKey> = pem_blocks
        .iter()
        .map(|block| RsaPublicKey::from_pem(block))
        .collect::<Result<_, _>>()?;
    let ring = Ring::new(keys);

    let trailer = trailer.trim_end_matches(['\n', '\r']);
    if trailer.is_empty() {
        return Err(CodecError::MissingTrailer.into());
    }

    // `trailer` ends in "==" (from the IV chunk), so splitting on "==" always
    // yields one trailing empty element; drop it.
    let mut parts: Vec<&str> = trailer.split("==").collect();
    if parts.last() == Some(&"") {
        parts.pop();
    }

    if parts.len() < 2 {
        return Err(CodecError::MissingIv.into());
    }

    let iv_chunk = parts.pop().expect("checked len >= 2 above");
    let iv_bytes = base64::decode(format!("{iv_chunk}=="))
        .map_err(CodecError::Base64)?;
    let iv: [u8; 16] = iv_bytes
        .clone()
        .try_into()
        .map_err(|_| CodecError::BadIvLength(iv_bytes.len()))?;

    let ints: Vec<BigUint> = parts
        .into_iter()
        .map(|chunk| {
            base64::decode(format!("{chunk}=="))
                .map(|bytes| BigUint::from_bytes_be(&bytes))
                .map_err(CodecError::Base64)
        })
        .collect::<Result<_, _>>()?;

    if ints.len() != ring.len() + 1 {
        return Err(CodecError::RingSizeMismatch(ring.len(), ints.len().saturating_sub(1)).into());
    }

    let v = ints[0].clone();
    let xs = ints[1..].to_vec();

    Ok((ring, Signature { v, xs, iv }))
}

/// Split `contents` into the ordered list of `PUBLIC KEY` PEM block bodies
/// and the remaining trailer text.
fn split_ring_and_trailer(contents: &str) -> (Vec<String>, String) {
    const BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
    const END: &str = "-----END PUBLIC KEY-----";

    let mut blocks = Vec::new();
    let mut current: Option<String> = None;
    let mut trailer = String::new();
    let mut in_trailer = false;

    for line in contents.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);

        if in_trailer {
            trailer.push_str(line);
            continue;
        }

        if trimmed == BEGIN {
            current = Some(format!("{trimmed}\n"));
        } else if trimmed == END {
            if let Some(mut block) = current.take() {
                block.push_str(trimmed);
                block.push('\n');
                blocks.push(block);
            }
        } else if let Some(block) = current.as_mut() {
            block.push_str(trimmed);
            block.push('\n');
        } else {
            in_trailer = true;
            trailer.push_str(line);
        }
    }

    (blocks, trailer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key;
    use once_cell::sync::Lazy;

    static E: Lazy<BigUint> = Lazy::new(|| BigUint::from(65537u32));

    #[test]
    fn int_width_always_gives_two_padding_chars() {
        for bits in [8u64, 128, 256, 1024, 2048, 2305] {
            let width = int_width(bits);
            assert_eq!(width % 3, 1);
            assert!(width * 8 >= bits as usize);
        }
    }

    #[test]
    fn signature_file_round_trips() {
        let (pk1, sk1) = key::generate_keypair(256, &E);
        let (pk2, sk2) = key::generate_keypair(256, &E);
        let ring = Ring::new(vec![pk1, pk2]);

        let sigma = ring.sign(b"round trip", 0, &sk1).unwrap();
        let encoded = encode(&ring, &sigma).unwrap();

        let (parsed_ring, parsed_sigma) = parse(&encoded).unwrap();

        assert_eq!(parsed_ring.keys(), ring.keys());
        assert_eq!(parsed_sigma, sigma);
        assert!(parsed_ring.verify(b"round trip", &parsed_sigma).unwrap());

        let _ = sk2;
    }

    #[test]
    fn parse_rejects_missing_ring_keys() {
        let err = parse("not a signature file\n").unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::NoRingKeys)));
    }

    #[test]
    fn parse_rejects_a_single_member_ring_without_panicking() {
        let (pk, sk) = key::generate_keypair(256, &E);
        let solo_ring_pem = pk.to_pem().unwrap();

        // A well-formed PEM block followed by a trailer, but with only one
        // ring member: must be a recoverable `CodecError`, not a panic from
        // `Ring::new`'s `r >= 2` invariant.
        let trailer = base64::encode([0u8; 16]);
        let contents = format!("{solo_ring_pem}{trailer}\n");

        let err = parse(&contents).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::RingTooSmall(1))));

        let _ = sk;
    }

    #[test]
    fn parse_rejects_corrupted_iv() {
        let (pk1, sk1) = key::generate_keypair(256, &E);
        let (pk2, _sk2) = key::generate_keypair(256, &E);
        let ring = Ring::new(vec![pk1, pk2]);
        let sigma = ring.sign(b"hi", 0, &sk1).unwrap();
        let encoded = encode(&ring, &sigma).unwrap();

        let (_, mut parsed_sigma) = parse(&encoded).unwrap();
        parsed_sigma.iv[0] ^= 0x01;

        assert!(!ring.verify(b"hi", &parsed_sigma).unwrap());
    }
}
