//! `BlockPrp`: the AES-256-CBC-without-padding keyed pseudorandom permutation
//! that underlies the ring equation's combining function `C_{k,v}`.
//!
//! A fresh `BlockPrp` is built once per sign/verify call from `k =
//! SHA-256(m)` and a 16-byte `iv`, and every
//! `eval`/`invert` on it independently re-seeds CBC chaining from that same
//! `iv` (mirroring the reference implementation, which builds a fresh
//! stream-cipher context from the same `Cipher` object on every call). What
//! must not happen is two *different* `BlockPrp` instances, built from the
//! same `(k, iv)`, being used interchangeably mid-computation — see
//! [`crate::ring`] for the call ordering this requires.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use num_bigint::BigUint;
use num_traits::Zero;
use zeroize::Zeroize;

const BLOCK_SIZE: usize = 16;

/// A 32-byte key paired with a 16-byte IV, keyed by `k = SHA-256(m)`.
pub struct BlockPrp {
    key: [u8; 32],
    iv: [u8; BLOCK_SIZE],
}

impl Drop for BlockPrp {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl BlockPrp {
    /// Build a `BlockPrp` from a 32-byte key and 16-byte IV.
    #[must_use]
    pub fn new(key: [u8; 32], iv: [u8; BLOCK_SIZE]) -> Self {
        BlockPrp { key, iv }
    }

    /// The canonical encoding width, in bytes, for one CBC invocation of `x`:
    /// the smallest multiple of 16 strictly exceeding `bit_length(x) / 8 - 1`,
    /// with the `x == 0` edge case pinned to 16.
    ///
    /// For `x` whose bit length fits in a single byte (`< 9` bits) the
    /// textbook formula degenerates below 16; we floor it there, since a
    /// zero- or negative-length CBC buffer cannot hold any value and ring
    /// members are drawn from a domain of thousands of bits, making this
    /// branch unreachable in practice.
    #[must_use]
    pub fn byte_length(x: &BigUint) -> usize {
        if x.is_zero() {
            return BLOCK_SIZE;
        }

        let bit_length = x.bits();
        let l = (bit_length / 8) as i64 - 1;
        let rounded = l - l.rem_euclid(16) + 16;

        usize::try_from(rounded).unwrap_or(0).max(BLOCK_SIZE)
    }

    /// `E_k(x)`: encode `x` big-endian into [`byte_length(x)`](Self::byte_length)
    /// bytes, encrypt under AES-256-CBC(key, iv) with no padding, decode the
    /// result big-endian.
    #[must_use]
    pub fn eval(&self, x: &BigUint) -> BigUint {
        let len = Self::byte_length(x);
        let plaintext = to_be_bytes_padded(x, len);
        let ciphertext = cbc_encrypt_no_padding(&self.key, &self.iv, &plaintext);
        BigUint::from_bytes_be(&ciphertext)
    }

    /// `E_k^{-1}(y)`: the mirror of [`eval`](Self::eval) using the decryptor.
    #[must_use]
    pub fn invert(&self, y: &BigUint) -> BigUint {
        let len = Self::byte_length(y);
        let ciphertext = to_be_bytes_padded(y, len);
        let plaintext = cbc_decrypt_no_padding(&self.key, &self.iv, &ciphertext);
        BigUint::from_bytes_be(&plaintext)
    }
}

fn to_be_bytes_padded(x: &BigUint, len: usize) -> Vec<u8> {
    let raw = x.to_bytes_be();
    assert!(raw.len() <= len, "byte_length computed too small for value");

    let mut out = vec![0u8; len];
    out[len - raw.len()..].copy_from_slice(&raw);
    out
}

fn cbc_encrypt_no_padding(key: &[u8; 32], iv: &[u8; BLOCK_SIZE], plaintext: &[u8]) -> Vec<u8> {
    assert_eq!(plaintext.len() % BLOCK_SIZE, 0, "CBC input must be block-aligned");

    let cipher = Aes256::new_from_slice(key).expect("AES-256 key must be 32 bytes");
    let mut prev = *iv;
    let mut out = Vec::with_capacity(plaintext.len());

    for block in plaintext.chunks(BLOCK_SIZE) {
        let mut buf = [0u8; BLOCK_SIZE];
        for i in 0..BLOCK_SIZE {
            buf[i] = block[i] ^ prev[i];
        }

        let mut generic = buf.into();
        cipher.encrypt_block(&mut generic);
        let ciphertext_block: [u8; BLOCK_SIZE] = generic.into();

        out.extend_from_slice(&ciphertext_block);
        prev = ciphertext_block;
    }

    out
}

fn cbc_decrypt_no_padding(key: &[u8; 32], iv: &[u8; BLOCK_SIZE], ciphertext: &[u8]) -> Vec<u8> {
    assert_eq!(
        ciphertext.len() % BLOCK_SIZE,
        0,
        "CBC input must be block-aligned"
    );

    let cipher = Aes256::new_from_slice(key).expect("AES-256 key must be 32 bytes");
    let mut prev = *iv;
    let mut out = Vec::with_capacity(ciphertext.len());

    for block in ciphertext.chunks(BLOCK_SIZE) {
        let mut generic = <[u8; BLOCK_SIZE]>::try_from(block).unwrap().into();
        cipher.decrypt_block(&mut generic);
        let decrypted: [u8; BLOCK_SIZE] = generic.into();

        let mut plain = [0u8; BLOCK_SIZE];
        for i in 0..BLOCK_SIZE {
            plain[i] = decrypted[i] ^ prev[i];
        }

        out.extend_from_slice(&plain);
        prev = <[u8; BLOCK_SIZE]>::try_from(block).unwrap();
    }

    out
}
