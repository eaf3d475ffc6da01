//! An implementation of RSA ring signatures, after Rivest, Shamir and Tauman's
//! *How to Leak a Secret* (Asiacrypt 2001).
//!
//! A ring signature lets any member of an ad-hoc group of RSA key holders (a
//! "ring") sign a message on the group's behalf, such that a verifier learns
//! only that *some* ring member signed it — not which one. No setup or
//! cooperation between ring members is required; anyone can assemble a ring
//! from public keys alone.
//!
//! The pieces, bottom-up:
//!
//! - [`primitive`]: the hash, RNG and modular exponentiation building blocks.
//! - [`prp`]: the symmetric combining permutation keyed by the message.
//! - [`perm`]: the per-member trap-door permutation `g_i`.
//! - [`key`]: RSA key material and its PEM/PKCS8 encoding.
//! - [`ring`]: the ring itself, and `sign`/`verify`.
//! - [`codec`]: the on-wire signature file format.
//!
//! This is **not** a general-purpose crypto library; it implements one
//! signature scheme end to end, deliberately, rather than factoring out
//! reusable primitives for their own sake.

#![deny(clippy::correctness)]
#![warn(clippy::style)]
#![warn(clippy::complexity)]
#![warn(clippy::perf)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::use_self)] // Not sure about this :/
#![allow(clippy::cast_precision_loss)] // I like it, but there are too many which renders it pointless
#![allow(clippy::cast_possible_truncation)] // I like it, but there are too many which renders it pointless
#![allow(clippy::needless_range_loop)] // Too many false positives, not very smart
#![allow(clippy::doc_markdown)] // Too many false positives, not very smart
#![allow(clippy::module_name_repetitions)] // Anti-pattern IMHO

pub mod codec;
pub mod error;
pub mod key;
pub mod perm;
pub mod primitive;
pub mod prp;
pub mod ring;

pub use error::{CodecError, Error};
pub use key::{RsaPrivateKey, RsaPublicKey};
pub use ring::{Ring, Signature};
