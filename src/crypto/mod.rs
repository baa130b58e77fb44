//! From-scratch cryptographic primitives for Cardwire.
//!
//! This module provides:
//! - Modular arithmetic helpers (extended Euclid, superincreasing checks)
//! - The Merkle-Hellman knapsack cryptosystem (half-key exchange)
//! - The deck-of-cards keystream generator and XOR stream cipher
//!
//! None of this is production cryptography: the knapsack scheme is
//! classically broken and kept as a teaching exercise.

pub mod arith;
pub mod deck;
pub mod knapsack;

pub use arith::ArithmeticError;
pub use deck::{DeckError, Keystream, StreamCipher, DECK_SIZE};
pub use knapsack::{generate_keys, KnapsackError, PrivateKey, PublicKey};
