//! Modular arithmetic helpers for the knapsack cryptosystem.
//!
//! Everything operates on arbitrary-precision integers so key sizes are
//! not capped by machine words.

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use thiserror::Error;

/// Errors from modular arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    /// No modular inverse exists because the operands share a factor.
    #[error("{a} has no inverse modulo {modulus}")]
    NoInverse { a: BigUint, modulus: BigUint },
}

/// Greatest common divisor via Euclid's algorithm.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    let mut a = a.clone();
    let mut b = b.clone();
    while !b.is_zero() {
        let remainder = &a % &b;
        a = b;
        b = remainder;
    }
    a
}

/// Returns true iff `gcd(a, b) == 1`.
pub fn coprime(a: &BigUint, b: &BigUint) -> bool {
    gcd(a, b).is_one()
}

/// Modular inverse of `a` modulo `modulus`, via the extended Euclidean
/// algorithm.
///
/// Returns the unique `s` in `[0, modulus)` with `(a * s) % modulus == 1`,
/// or [`ArithmeticError::NoInverse`] when `a` and `modulus` are not
/// coprime.
pub fn mod_inverse(a: &BigUint, modulus: &BigUint) -> Result<BigUint, ArithmeticError> {
    let mut old_r = BigInt::from(a.clone());
    let mut r = BigInt::from(modulus.clone());
    let mut old_s = BigInt::one();
    let mut s = BigInt::zero();

    while !r.is_zero() {
        let quotient = &old_r / &r;
        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return Err(ArithmeticError::NoInverse {
            a: a.clone(),
            modulus: modulus.clone(),
        });
    }

    let m = BigInt::from(modulus.clone());
    let inverse = ((old_s % &m) + &m) % &m;
    Ok(inverse
        .to_biguint()
        .expect("inverse was reduced into [0, modulus)"))
}

/// Returns whether every element strictly exceeds the sum of all elements
/// before it.
pub fn is_superincreasing(seq: &[BigUint]) -> bool {
    let mut total = BigUint::zero();
    for n in seq {
        if *n <= total {
            return false;
        }
        total += n;
    }
    true
}

/// Big-endian bit decomposition of a byte.
pub fn byte_to_bits(byte: u8) -> [bool; 8] {
    let mut bits = [false; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = byte >> (7 - i) & 1 == 1;
    }
    bits
}

/// Exact inverse of [`byte_to_bits`].
pub fn bits_to_byte(bits: &[bool; 8]) -> u8 {
    bits.iter().fold(0, |byte, &bit| byte << 1 | u8::from(bit))
}
