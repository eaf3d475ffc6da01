//! `ExtendedPermutation`: the per-member trap-door permutation `g_i` that
//! lifts RSA over `Z_{n_i}` to the common domain `[0, 2^b)`.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;

use crate::primitive::mod_pow;

/// `g_i(m)`: the forward extended trap-door permutation for ring member `i`,
/// whose modulus/exponent is `(n, e)`, over the domain `[0, 2^b)`.
///
/// Tiles RSA over `Z_n` across the region `[0, floor(2^b / n) * n)`; the
/// residual `[floor(2^b / n) * n, 2^b)` is the identity. With `b` chosen per
/// [`crate::ring::Ring::domain_bits`] the residual is a negligible fraction
/// of the domain.
#[must_use]
pub fn g(n: &BigUint, e: &BigUint, two_pow_b: &BigUint, m: &BigUint) -> BigUint {
    let (q, r) = m.div_rem(n);

    if (&q + BigUint::one()) * n <= *two_pow_b {
        q * n + mod_pow(&r, e, n)
    } else {
        m.clone()
    }
}

/// `g_i^{-1}(y)`: the inverse of [`g`], using the secret exponent `d`.
#[must_use]
pub fn g_inverse(n: &BigUint, d: &BigUint, two_pow_b: &BigUint, y: &BigUint) -> BigUint {
    g(n, d, two_pow_b, y)
}
