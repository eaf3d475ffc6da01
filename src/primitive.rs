//! Thin wrappers around the modular-exponentiation, hashing, and CSPRNG
//! primitives the ring-signature math is built from.
//!
//! Kept as a seam (rather than calling `num_bigint`/`sha2`/`rand` directly
//! from [`crate::perm`]/[`crate::ring`]) so the one place that is allowed to
//! know "how RSA/SHA-256/randomness actually happen" is this module.

use num_bigint::{BigUint, RandBigInt};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Modular exponentiation `base^exp mod modulus`.
///
/// Used both for the public-exponent path (`e`, not secret) and the
/// secret-exponent path (`d`, at sign time). `num-bigint`'s `modpow` is not
/// advertised as constant-time; per the design notes this is the accepted
/// trade-off for this crate (no hand-rolled bignum), but callers on the
/// secret-exponent path should treat the cost of this call, not just its
/// result, as potentially observable.
#[must_use]
pub fn mod_pow(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// SHA-256 of `message`.
#[must_use]
pub fn sha256(message: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Draw a uniformly random integer in `[0, 2^bits)` from the process CSPRNG.
#[must_use]
pub fn random_bits(bits: u64) -> BigUint {
    OsRng.gen_biguint(bits)
}

/// Draw `n` random bytes from the process CSPRNG.
#[must_use]
pub fn random_bytes<const N: usize>() -> [u8; N] {
    use rand_core::RngCore;

    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}
