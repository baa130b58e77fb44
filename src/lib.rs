//! # Cardwire - encrypted chat from a deck of cards and a knapsack
//!
//! Cardwire is a peer-to-peer encrypted chat demonstrator built on two
//! from-scratch primitives:
//!
//! - A **Merkle-Hellman knapsack cryptosystem** moves short "half-key"
//!   secrets between peers during the handshake.
//! - A **deck-of-cards stream cipher** (a 54-card Solitaire-style
//!   keystream generator) encrypts the chat traffic once both half-keys
//!   are combined into a session seed.
//!
//! A small **key directory service** maps client ids (listening ports)
//! to published knapsack public keys so peers can find each other with
//! no pre-shared material.
//!
//! ## Security model
//!
//! None of this is production cryptography. The knapsack scheme is
//! classically broken and the deck cipher is a toy; there is no
//! authentication, forward secrecy, or replay protection. Cardwire is a
//! teaching exercise in exact big-integer arithmetic, greedy subset-sum
//! decoding, and bit-exact keystream generation.
//!
//! ## Example
//!
//! ```rust
//! use cardwire::crypto::knapsack::{self, generate_keys};
//! use cardwire::crypto::StreamCipher;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! // knapsack round-trip
//! let mut rng = StdRng::seed_from_u64(7);
//! let (private, public) = generate_keys(8, &mut rng).unwrap();
//! let ciphertexts = knapsack::encrypt(b"HELLO", &public).unwrap();
//! assert_eq!(knapsack::decrypt(&ciphertexts, &private).unwrap(), b"HELLO");
//!
//! // deck cipher round-trip: equal seeds, equal keystreams
//! let mut sender = StreamCipher::from_seed(b"session seed");
//! let mut receiver = StreamCipher::from_seed(b"session seed");
//! let encrypted = sender.encrypt(b"HELLO");
//! assert_eq!(receiver.decrypt(&encrypted), b"HELLO");
//! ```
//!
//! ## Modules
//!
//! - [`crypto`]: the knapsack cryptosystem, the deck cipher, and their
//!   arithmetic helpers
//! - [`chat`]: handshake protocol, sessions, wire frames, transport
//! - [`directory`]: the key directory service and its clients

pub mod chat;
pub mod crypto;
pub mod directory;

// Re-export commonly used types at the crate root
pub use chat::{run_handshake, ChatConfig, ChatError, Role, Session, WireMessage};
pub use crypto::{generate_keys, Keystream, PrivateKey, PublicKey, StreamCipher};
pub use directory::{ClientId, KeyDirectory, KeyServer, MemoryDirectory, RemoteDirectory};
