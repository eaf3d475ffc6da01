//! `Ring`: the ordered set of public keys, the common domain width `b`, and
//! the `sign`/`verify` operations of the RST2001 scheme.

use num_bigint::BigUint;
use num_traits::One;
use tracing::debug;

use crate::error::Error;
use crate::key::{RsaPrivateKey, RsaPublicKey};
use crate::perm::{g, g_inverse};
use crate::primitive::{random_bits, random_bytes, sha256};
use crate::prp::BlockPrp;

/// Slack, in bits, `b` must exceed every member modulus by: large enough
/// that the "pass-through" region of `g_i` is hit with negligible
/// probability.
const DOMAIN_SLACK_BITS: u64 = 160;

/// `b` is always rounded up to a multiple of this, so the encoded domain is
/// CBC-block-aligned.
const DOMAIN_ALIGNMENT_BITS: u64 = 128;

/// An ordered ring of `r >= 2` RSA public keys.
#[derive(Debug, Clone)]
pub struct Ring {
    keys: Vec<RsaPublicKey>,
    b: u64,
}

/// `sigma = (v, x_0, .., x_{r-1}, iv)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub v: BigUint,
    pub xs: Vec<BigUint>,
    pub iv: [u8; 16],
}

impl Ring {
    /// Build a ring from its members' public keys, computing the common
    /// domain width `b`: `bit_length(max_i n_i) + 160`, rounded up to a
    /// multiple of 128.
    ///
    /// # Panics
    ///
    /// If `keys` has fewer than 2 members.
    #[must_use]
    pub fn new(keys: Vec<RsaPublicKey>) -> Self {
        assert!(keys.len() >= 2, "a ring must have at least 2 members");

        let max_bits = keys
            .iter()
            .map(RsaPublicKey::key_size)
            .max()
            .expect("checked non-empty above");

        let b = round_up(max_bits + DOMAIN_SLACK_BITS, DOMAIN_ALIGNMENT_BITS);

        Ring { keys, b }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> &[RsaPublicKey] {
        &self.keys
    }

    /// The common domain exponent `b`: every `g_i` is a permutation of
    /// `[0, 2^b)`.
    #[must_use]
    pub fn domain_bits(&self) -> u64 {
        self.b
    }

    fn two_pow_b(&self) -> BigUint {
        BigUint::one() << self.b
    }

    fn check_ring_fits_domain(&self) -> Result<(), Error> {
        let bound = self.two_pow_b();

        for (i, key) in self.keys.iter().enumerate() {
            if key.n >= bound {
                return Err(Error::ModulusTooLarge(i));
            }
        }

        Ok(())
    }

    /// Sign `message` as ring member `s`, using secret key `sk`.
    ///
    /// # Errors
    ///
    /// - [`Error::SignerIndexOutOfRange`] if `s >= self.len()`.
    /// - [`Error::SignerKeyMismatch`] if `sk.n != self.keys()[s].n`.
    /// - [`Error::ModulusTooLarge`] if any ring member's modulus doesn't fit
    ///   inside `2^b`.
    pub fn sign(&self, message: &[u8], s: usize, sk: &RsaPrivateKey) -> Result<Signature, Error> {
        if s >= self.keys.len() {
            return Err(Error::SignerIndexOutOfRange(s, self.keys.len()));
        }
        if sk.n != self.keys[s].n {
            return Err(Error::SignerKeyMismatch(s));
        }
        self.check_ring_fits_domain()?;

        debug!(ring_size = self.keys.len(), b = self.b, s, "ring sign");

        let two_pow_b = self.two_pow_b();
        let k = sha256(message);
        let iv: [u8; 16] = random_bytes();
        let prp = BlockPrp::new(k, iv);

        let v = random_bits(self.b);

        let mut xs = vec![BigUint::default(); self.keys.len()];
        let mut ys = vec![BigUint::default(); self.keys.len()];

        for i in 0..self.keys.len() {
            if i == s {
                continue;
            }

            let x_i = random_bits(self.b);
            ys[i] = g(&self.keys[i].n, &self.keys[i].e, &two_pow_b, &x_i);
            xs[i] = x_i;
        }

        // Walk E_k forward from v up through slot s-1, and E_k^-1 backward
        // from v down through slot s+1; the two walks meet at slot s.
        let mut y_enc = v.clone();
        for y_j in ys.iter().take(s) {
            y_enc = prp.eval(&(&y_enc ^ y_j));
        }

        let mut y_dec = v.clone();
        for y_p in ys[s + 1..].iter().rev() {
            y_dec = y_p ^ prp.invert(&y_dec);
        }

        let y_s = &y_enc ^ &prp.invert(&y_dec);

        xs[s] = g_inverse(&sk.n, sk.d(), &two_pow_b, &y_s);

        Ok(Signature { v, xs, iv })
    }

    /// Verify that `sigma` is a valid ring signature for `message` under
    /// this ring.
    ///
    /// Returns `Ok(false)` on any ring-equation mismatch — this is a normal
    /// outcome, not an error. Returns `Err` only for structural problems that
    /// must be caught before the ring equation is even evaluated (size
    /// mismatch, oversized modulus).
    pub fn verify(&self, message: &[u8], sigma: &Signature) -> Result<bool, Error> {
        if sigma.xs.len() != self.keys.len() {
            return Err(Error::Codec(crate::error::CodecError::RingSizeMismatch(
                self.keys.len(),
                sigma.xs.len(),
            )));
        }
        self.check_ring_fits_domain()?;

        debug!(ring_size = self.keys.len(), b = self.b, "ring verify");

        let two_pow_b = self.two_pow_b();
        let k = sha256(message);
        let prp = BlockPrp::new(k, sigma.iv);

        let ys: Vec<BigUint> = self
            .keys
            .iter()
            .zip(&sigma.xs)
            .map(|(key, x_i)| g(&key.n, &key.e, &two_pow_b, x_i))
            .collect();

        let mut y_enc = sigma.v.clone();
        for y_i in &ys {
            y_enc = prp.eval(&(&y_enc ^ y_i));
        }

        Ok(y_enc == sigma.v)
    }
}

fn round_up(value: u64, multiple: u64) -> u64 {
    ((value + multiple - 1) / multiple) * multiple
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key;
    use once_cell::sync::Lazy;

    static E: Lazy<BigUint> = Lazy::new(|| BigUint::from(65537u32));

    fn small_ring(n: usize) -> (Ring, Vec<RsaPrivateKey>) {
        let mut pks = Vec::with_capacity(n);
        let mut sks = Vec::with_capacity(n);

        for _ in 0..n {
            let (pk, sk) = key::generate_keypair(256, &E);
            pks.push(pk);
            sks.push(sk);
        }

        (Ring::new(pks), sks)
    }

    #[test]
    fn domain_bits_dominates_every_modulus() {
        let (ring, _sks) = small_ring(3);

        for key in ring.keys() {
            assert!(BigUint::one() << ring.domain_bits() > key.n);
        }
        assert_eq!(ring.domain_bits() % DOMAIN_ALIGNMENT_BITS, 0);
    }

    #[test]
    fn sign_then_verify_succeeds_for_every_signer_index() {
        let (ring, sks) = small_ring(3);
        let message = b"The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";

        for s in 0..3 {
            let sigma = ring.sign(message, s, &sks[s]).unwrap();
            assert!(ring.verify(message, &sigma).unwrap());
        }
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let (ring, sks) = small_ring(2);
        let sigma = ring.sign(b"hi", 0, &sks[0]).unwrap();

        assert!(ring.verify(b"hi", &sigma).unwrap());
        assert!(!ring.verify(b"Hi", &sigma).unwrap());
    }

    #[test]
    fn verify_rejects_tampered_v() {
        let (ring, sks) = small_ring(2);
        let mut sigma = ring.sign(b"hi", 0, &sks[0]).unwrap();

        sigma.v = &sigma.v ^ &BigUint::one();

        assert!(!ring.verify(b"hi", &sigma).unwrap());
    }

    #[test]
    fn verify_rejects_tampered_iv() {
        let (ring, sks) = small_ring(2);
        let mut sigma = ring.sign(b"hi", 0, &sks[0]).unwrap();

        sigma.iv[0] ^= 0x01;

        assert!(!ring.verify(b"hi", &sigma).unwrap());
    }

    #[test]
    fn verify_rejects_tampered_x() {
        let (ring, sks) = small_ring(2);
        let mut sigma = ring.sign(b"hi", 0, &sks[0]).unwrap();

        sigma.xs[1] = &sigma.xs[1] ^ &BigUint::one();

        assert!(!ring.verify(b"hi", &sigma).unwrap());
    }

    #[test]
    fn verify_rejects_foreign_ring_member() {
        let (ring, sks) = small_ring(2);
        let sigma = ring.sign(b"hi", 0, &sks[0]).unwrap();

        let (other_pk, _) = key::generate_keypair(256, &E);
        let mut keys = ring.keys().to_vec();
        keys[1] = other_pk;
        let tampered_ring = Ring::new(keys);

        assert!(!tampered_ring.verify(b"hi", &sigma).unwrap());
    }

    #[test]
    fn sign_rejects_out_of_range_signer_index() {
        let (ring, sks) = small_ring(2);
        let err = ring.sign(b"hi", 5, &sks[0]).unwrap_err();
        assert!(matches!(err, Error::SignerIndexOutOfRange(5, 2)));
    }

    #[test]
    fn sign_rejects_mismatched_signer_key() {
        let (ring, sks) = small_ring(2);
        let err = ring.sign(b"hi", 0, &sks[1]).unwrap_err();
        assert!(matches!(err, Error::SignerKeyMismatch(0)));
    }

    #[test]
    fn mixed_key_sizes_still_sign_and_verify() {
        let (pk1, sk1) = key::generate_keypair(256, &E);
        let (pk2, sk2) = key::generate_keypair(384, &E);
        let (pk3, sk3) = key::generate_keypair(384, &E);

        let ring = Ring::new(vec![pk1, pk2, pk3]);
        assert!(ring.domain_bits() >= 384 + DOMAIN_SLACK_BITS);
        assert_eq!(ring.domain_bits() % DOMAIN_ALIGNMENT_BITS, 0);

        for (s, sk) in [sk1, sk2, sk3].iter().enumerate() {
            let sigma = ring.sign(b"mixed sizes", s, sk).unwrap();
            assert!(ring.verify(b"mixed sizes", &sigma).unwrap());
        }
    }
}
