//! Merkle-Hellman knapsack cryptosystem.
//!
//! Classically broken, so it is used here only to move short handshake
//! secrets, never the chat traffic itself. Keys are validated on
//! construction: the greedy subset-sum decoder is only correct when the
//! private sequence is strictly superincreasing.

use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::arith::{self, ArithmeticError};

/// Default number of knapsack elements; one encrypted unit carries one
/// byte, so at least 8 are required.
pub const DEFAULT_KEY_SIZE: usize = 8;

/// Retry ceiling for the coprime multiplier search.
const MAX_MULTIPLIER_RETRIES: usize = 1000;

/// Errors from knapsack key generation, encryption, or decryption.
#[derive(Error, Debug)]
pub enum KnapsackError {
    /// Key generation could not produce a valid key pair.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The public key is too short to encode a byte.
    #[error("public key has {n} elements, need at least 8 to encrypt a byte")]
    Encoding { n: usize },

    /// A ciphertext unit does not decode under this private key.
    #[error("ciphertext unit {index} does not decode: {reason}")]
    Decoding { index: usize, reason: String },

    /// Internal-consistency failure in the modular arithmetic; unreachable
    /// for keys built through the validated constructors.
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

/// Private half of a knapsack key pair: the superincreasing sequence `w`,
/// the modulus `q` and the multiplier `r`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    w: Vec<BigUint>,
    q: BigUint,
    r: BigUint,
}

/// Published half of a knapsack key pair: `beta[i] = (r * w[i]) % q`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    beta: Vec<BigUint>,
}

impl PrivateKey {
    /// Builds a private key from raw components.
    ///
    /// Validates that `w` is strictly superincreasing, that `q` exceeds
    /// the sum of `w`, and that `r` is coprime to `q`.
    pub fn new(w: Vec<BigUint>, q: BigUint, r: BigUint) -> Result<Self, KnapsackError> {
        if w.is_empty() {
            return Err(KnapsackError::KeyGeneration(
                "knapsack sequence is empty".to_string(),
            ));
        }
        if !arith::is_superincreasing(&w) {
            return Err(KnapsackError::KeyGeneration(
                "knapsack sequence is not superincreasing".to_string(),
            ));
        }
        let total: BigUint = w.iter().sum();
        if q <= total {
            return Err(KnapsackError::KeyGeneration(
                "modulus must exceed the sequence sum".to_string(),
            ));
        }
        if !arith::coprime(&r, &q) {
            return Err(KnapsackError::KeyGeneration(
                "multiplier shares a factor with the modulus".to_string(),
            ));
        }
        Ok(Self { w, q, r })
    }

    /// Derives the matching public key.
    pub fn public_key(&self) -> PublicKey {
        let beta = self.w.iter().map(|wi| (&self.r * wi) % &self.q).collect();
        PublicKey { beta }
    }

    /// Number of knapsack elements.
    pub fn len(&self) -> usize {
        self.w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }
}

impl PublicKey {
    /// Number of knapsack elements.
    pub fn len(&self) -> usize {
        self.beta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beta.is_empty()
    }
}

/// Generates a key pair with `n` knapsack elements.
///
/// The superincreasing sequence starts with a small random element and
/// each subsequent draw lands strictly above the running total but at
/// most double it; the modulus is drawn the same way from the full total
/// and the multiplier is retried until coprime with it. The randomness
/// source is injected so callers can make generation reproducible.
pub fn generate_keys<R: Rng + ?Sized>(
    n: usize,
    rng: &mut R,
) -> Result<(PrivateKey, PublicKey), KnapsackError> {
    if n == 0 {
        return Err(KnapsackError::KeyGeneration(
            "key size must be nonzero".to_string(),
        ));
    }

    let mut total = BigUint::from(rng.gen_range(2u32..=10));
    let mut w = Vec::with_capacity(n);
    w.push(total.clone());
    for _ in 1..n {
        let next = draw_above(&total, rng);
        total += &next;
        w.push(next);
    }
    let q = draw_above(&total, rng);

    let two = BigUint::from(2u32);
    let mut r = None;
    for _ in 0..MAX_MULTIPLIER_RETRIES {
        let candidate = rng.gen_biguint_range(&two, &q);
        if arith::coprime(&candidate, &q) {
            r = Some(candidate);
            break;
        }
    }
    let r = r.ok_or_else(|| {
        KnapsackError::KeyGeneration(format!(
            "no multiplier coprime to the modulus found in {MAX_MULTIPLIER_RETRIES} draws"
        ))
    })?;

    let private = PrivateKey::new(w, q, r)?;
    let public = private.public_key();
    Ok((private, public))
}

/// Uniform draw from `(total, 2 * total]`.
fn draw_above<R: Rng + ?Sized>(total: &BigUint, rng: &mut R) -> BigUint {
    let low = total + 1u32;
    let high = total * 2u32 + 1u32;
    rng.gen_biguint_range(&low, &high)
}

/// Encrypts bytes under a public key, producing one ciphertext integer
/// per plaintext byte.
///
/// Each byte is decomposed into `n` big-endian bits (zero-padded on the
/// high side when `n > 8`) and the ciphertext is the sum of the public
/// elements selected by the set bits.
pub fn encrypt(plaintext: &[u8], public_key: &PublicKey) -> Result<Vec<BigUint>, KnapsackError> {
    let n = public_key.len();
    if n < 8 {
        return Err(KnapsackError::Encoding { n });
    }
    let offset = n - 8;

    let ciphertexts = plaintext
        .iter()
        .map(|&byte| {
            arith::byte_to_bits(byte)
                .iter()
                .enumerate()
                .filter(|(_, &bit)| bit)
                .map(|(i, _)| &public_key.beta[offset + i])
                .sum()
        })
        .collect();
    Ok(ciphertexts)
}

/// Decrypts ciphertext units with the private key.
///
/// Each unit is untransformed with the modular inverse of `r`, then the
/// greedy superincreasing subset-sum recovers the bit pattern from the
/// largest element down. A nonzero residue after the full pass means the
/// ciphertext is corrupt or was made for a different key.
pub fn decrypt(
    ciphertexts: &[BigUint],
    private_key: &PrivateKey,
) -> Result<Vec<u8>, KnapsackError> {
    let s = arith::mod_inverse(&private_key.r, &private_key.q)?;

    let mut plaintext = Vec::with_capacity(ciphertexts.len());
    for (index, c) in ciphertexts.iter().enumerate() {
        let mut residue = (c * &s) % &private_key.q;
        let mut bits = vec![false; private_key.w.len()];
        for (i, wi) in private_key.w.iter().enumerate().rev() {
            if *wi <= residue {
                bits[i] = true;
                residue -= wi;
            }
        }
        if !residue.is_zero() {
            return Err(KnapsackError::Decoding {
                index,
                reason: "nonzero subset-sum residue".to_string(),
            });
        }

        let mut value: u16 = 0;
        for &bit in &bits {
            value = value << 1 | u16::from(bit);
            if value > 255 {
                return Err(KnapsackError::Decoding {
                    index,
                    reason: "recovered value exceeds one byte".to_string(),
                });
            }
        }
        plaintext.push(value as u8);
    }
    Ok(plaintext)
}
