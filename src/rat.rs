//! Exact rational helpers.
//!
//! The engine works over arbitrary-precision rationals
//! ([`num_rational::BigRational`]). This module supplies the handful of
//! operations the `num` stack does not expose directly in the form the
//! elimination algorithms want: floor division and the matching modulo
//! (nonnegative remainder for positive modulus), and gcd/lcm extended from
//! integers to rationals.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// Construct a rational from an integer constant.
pub fn rat(n: i64) -> BigRational {
    BigRational::from(BigInt::from(n))
}

/// Floor division: the greatest integer q with `q * b <= a` for `b > 0`.
///
/// Matches integer `div` semantics used by divisibility and mod/div atoms.
pub fn floor_div(a: &BigRational, b: &BigRational) -> BigRational {
    debug_assert!(!b.is_zero());
    (a / b).floor()
}

/// Floor modulo: `a - b * floor_div(a, b)`.
///
/// Nonnegative whenever `b > 0`.
pub fn floor_mod(a: &BigRational, b: &BigRational) -> BigRational {
    a - b * floor_div(a, b)
}

/// Gcd of two rationals: `gcd(n1, n2) / lcm(d1, d2)`, nonnegative.
///
/// Coincides with integer gcd on integer-valued arguments, which is the
/// only case the engine relies on for its normalization and divisibility
/// tautology checks.
pub fn rat_gcd(a: &BigRational, b: &BigRational) -> BigRational {
    if a.is_zero() {
        return b.abs();
    }
    if b.is_zero() {
        return a.abs();
    }
    BigRational::new(a.numer().gcd(b.numer()), a.denom().lcm(b.denom()))
}

/// Lcm of two rationals: `lcm(n1, n2) / gcd(d1, d2)`, nonnegative.
pub fn rat_lcm(a: &BigRational, b: &BigRational) -> BigRational {
    if a.is_zero() || b.is_zero() {
        return BigRational::zero();
    }
    BigRational::new(a.numer().lcm(b.numer()), a.denom().gcd(b.denom()))
}

/// Lcm of the denominators of an iterator of rationals, as a rational.
pub fn denominator_lcm<'a>(it: impl Iterator<Item = &'a BigRational>) -> BigRational {
    let mut lc = BigInt::one();
    for q in it {
        lc = lc.lcm(q.denom());
    }
    BigRational::from(lc)
}
