//! RSA key material: the `(n, e)` / `(n, d)` pairs the ring math runs on,
//! plus PEM loading/decryption and a test/demo keygen.
//!
//! All signature math runs on `num_bigint::BigUint`. The `rsa` and
//! `pkcs8` crates are used purely as PEM/PKCS8 codecs here: once a key is
//! parsed, its `n`/`e`/`d` are copied out as big-endian bytes into our own
//! `BigUint`s and the parser's key object is dropped.

mod primes;
mod util;

use num_bigint::BigUint;
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};

use crate::error::Error;

/// A ring member's public key: the `(n, e)` pair RSA is defined over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub n: BigUint,
    pub e: BigUint,
}

/// A signer's secret key: `(n, d)`. Never serialized by the core; `d` is
/// zeroized on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    pub n: BigUint,
    d: BigUint,
}

impl Drop for RsaPrivateKey {
    fn drop(&mut self) {
        // `BigUint` carries no `Zeroize` impl of its own; replacing it with
        // a fresh zero value is the best effort available without vendoring
        // a zeroizing bignum type.
        self.d = BigUint::from(0u32);
    }
}

impl RsaPrivateKey {
    #[must_use]
    pub fn d(&self) -> &BigUint {
        &self.d
    }
}

fn dig_to_biguint(x: &rsa::BigUint) -> BigUint {
    BigUint::from_bytes_be(&x.to_bytes_be())
}

impl RsaPublicKey {
    /// `keysize(n)`: `n`'s bit length, as used for `b`'s computation.
    #[must_use]
    pub fn key_size(&self) -> u64 {
        self.n.bits()
    }

    /// Parse a single PEM `PUBLIC KEY` (`SubjectPublicKeyInfo`) block.
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let key = rsa::RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| Error::InvalidPem(e.to_string()))?;

        Ok(RsaPublicKey {
            n: dig_to_biguint(key.n()),
            e: dig_to_biguint(key.e()),
        })
    }

    /// Read every `PUBLIC KEY` PEM block found in `path`, in file order.
    ///
    /// Mirrors the reference `process_pks`: blocks are recognised purely by
    /// their `-----BEGIN/END PUBLIC KEY-----` delimiters; anything else in
    /// the file is ignored.
    pub fn load_ring_pem(contents: &str) -> Result<Vec<Self>, Error> {
        parse_pem_blocks(contents, "PUBLIC KEY")
            .into_iter()
            .map(|block| Self::from_pem(&block))
            .collect()
    }

    /// Re-encode as a `SubjectPublicKeyInfo` PEM `PUBLIC KEY` block.
    pub fn to_pem(&self) -> Result<String, Error> {
        let key = to_rsa_public_key(&self.n, &self.e)?;
        key.to_public_key_pem(pkcs8::LineEnding::LF)
            .map_err(|e| Error::InvalidPem(e.to_string()))
    }
}

impl RsaPrivateKey {
    /// Parse a PEM `PRIVATE KEY` or `ENCRYPTED PRIVATE KEY` block, decrypting
    /// with `password` when the block is encrypted.
    pub fn from_pem(pem: &str, password: Option<&str>) -> Result<Self, Error> {
        let is_encrypted = pem.contains("ENCRYPTED PRIVATE KEY");

        let key = if is_encrypted {
            let password = password.ok_or(Error::BadPassword)?;
            rsa::RsaPrivateKey::from_pkcs8_encrypted_pem(pem, password)
                .map_err(|_| Error::BadPassword)?
        } else {
            rsa::RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| Error::InvalidPem(e.to_string()))?
        };

        Ok(RsaPrivateKey {
            n: dig_to_biguint(key.n()),
            d: dig_to_biguint(key.d()),
        })
    }

}

fn to_rsa_public_key(n: &BigUint, e: &BigUint) -> Result<rsa::RsaPublicKey, Error> {
    let n = rsa::BigUint::from_bytes_be(&n.to_bytes_be());
    let e = rsa::BigUint::from_bytes_be(&e.to_bytes_be());

    rsa::RsaPublicKey::new(n, e).map_err(|e| Error::InvalidPem(e.to_string()))
}

fn encode_private_pem(
    key: &rsa::RsaPrivateKey,
    password: Option<&str>,
) -> Result<String, Error> {
    match password {
        Some(password) => key
            .to_pkcs8_encrypted_pem(&mut rand::rngs::OsRng, password, pkcs8::LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| Error::InvalidPem(e.to_string())),
        None => key
            .to_pkcs8_pem(pkcs8::LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| Error::InvalidPem(e.to_string())),
    }
}

/// Extract the bodies of every `-----BEGIN {label}----- ... -----END
/// {label}-----` block appearing in `contents`, in order.
fn parse_pem_blocks(contents: &str, label: &str) -> Vec<String> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let mut blocks = Vec::new();
    let mut current: Option<String> = None;

    for line in contents.lines() {
        if line == begin {
            current = Some(format!("{line}\n"));
        } else if line == end {
            if let Some(mut block) = current.take() {
                block.push_str(line);
                block.push('\n');
                blocks.push(block);
            }
        } else if let Some(block) = current.as_mut() {
            block.push_str(line);
            block.push('\n');
        }
    }

    blocks
}

/// Generate a test/demo RSA keypair of `bits` total modulus size with public
/// exponent `e`. **Not** part of the ring-signature protocol — keypair
/// generation is out of scope for it; provided so the CLI and test suite can run
/// without an external `openssl` dependency.
#[must_use]
pub fn generate_keypair(bits: u32, e: &BigUint) -> (RsaPublicKey, RsaPrivateKey) {
    generate_keypair_with_primes(bits, e).0
}

/// As [`generate_keypair`], but also returns PEM encodings of both halves
/// (the public key as `SubjectPublicKeyInfo`, the private key as PKCS8,
/// optionally encrypted with `password`) — used by the CLI's `keygen`
/// subcommand. PKCS8 RSA private keys carry `p`/`q`, so unlike
/// [`generate_keypair`] this keeps the primes around long enough to build
/// them.
pub fn generate_keypair_pem(
    bits: u32,
    e: &BigUint,
    password: Option<&str>,
) -> Result<(RsaPublicKey, RsaPrivateKey, String, String), Error> {
    let (pk, sk, p, q) = generate_keypair_with_primes(bits, e);

    let rsa_n = rsa::BigUint::from_bytes_be(&pk.n.to_bytes_be());
    let rsa_e = rsa::BigUint::from_bytes_be(&pk.e.to_bytes_be());
    let rsa_d = rsa::BigUint::from_bytes_be(&sk.d.to_bytes_be());
    let rsa_p = rsa::BigUint::from_bytes_be(&p.to_bytes_be());
    let rsa_q = rsa::BigUint::from_bytes_be(&q.to_bytes_be());

    let private_key = rsa::RsaPrivateKey::from_components(rsa_n, rsa_e, rsa_d, vec![rsa_p, rsa_q])
        .map_err(|e| Error::InvalidPem(e.to_string()))?;

    let public_pem = to_rsa_public_key(&pk.n, &pk.e)?
        .to_public_key_pem(pkcs8::LineEnding::LF)
        .map_err(|e| Error::InvalidPem(e.to_string()))?;
    let private_pem = encode_private_pem(&private_key, password)?;

    Ok((pk, sk, public_pem, private_pem))
}

fn generate_keypair_with_primes(
    bits: u32,
    e: &BigUint,
) -> (RsaPublicKey, RsaPrivateKey, BigUint, BigUint) {
    loop {
        let p = primes::gen_rsa_prime(bits / 2, e);
        let q = primes::gen_rsa_prime(bits / 2, e);

        if let Some((pk, sk)) = generate_keypair_from_primes(e.clone(), &p, &q) {
            return (pk, sk, p, q);
        }
    }
}

/// Derive a keypair from explicit primes `p`, `q`, and exponent `e`. Returns
/// `None` if `e` has no inverse modulo `lcm(p-1, q-1)`.
#[must_use]
fn generate_keypair_from_primes(
    e: BigUint,
    p: &BigUint,
    q: &BigUint,
) -> Option<(RsaPublicKey, RsaPrivateKey)> {
    use num_bigint::BigInt;

    let p_1 = p - BigUint::from(1u32);
    let q_1 = q - BigUint::from(1u32);

    // Carmichael's totient: lcm(p-1, q-1) = (p-1)(q-1) / gcd(p-1, q-1).
    let (gcd_p_1_q_1, _, _) = util::egcd(BigInt::from(p_1.clone()), BigInt::from(q_1.clone()));
    let totient = (p_1 * q_1)
        / gcd_p_1_q_1
            .to_biguint()
            .expect("gcd of two positive integers cannot be negative");

    let n = p * q;
    let d = util::inv_mod(e.clone(), &totient)?;

    Some((RsaPublicKey { n: n.clone(), e }, RsaPrivateKey { n, d }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static E: Lazy<BigUint> = Lazy::new(|| BigUint::from(3u32));

    #[test]
    fn keygen_from_primes_round_trips() {
        let (pk, sk) =
            generate_keypair_from_primes(E.clone(), &BigUint::from(11u32), &BigUint::from(23u32))
                .unwrap();

        let m = BigUint::from(17u32);
        let c = m.modpow(&pk.e, &pk.n);
        let recovered = c.modpow(sk.d(), &sk.n);

        assert_eq!(recovered, m);
    }

    #[test]
    fn keygen_rejects_non_invertible_exponent() {
        // gcd(e=3, totient) != 1 for these tiny primes.
        let result =
            generate_keypair_from_primes(E.clone(), &BigUint::from(7u32), &BigUint::from(11u32));

        assert_eq!(result, None);
    }

    #[test]
    fn parse_pem_blocks_finds_each_key_and_ignores_trailer() {
        let doc = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n\
                   -----BEGIN PUBLIC KEY-----\nBBBB\n-----END PUBLIC KEY-----\n\
                   dHJhaWxpbmcgbGluZQ==\n";

        let blocks = parse_pem_blocks(doc, "PUBLIC KEY");
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("AAAA"));
        assert!(blocks[1].contains("BBBB"));
    }
}
