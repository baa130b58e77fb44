//! # Cardwire chat module
//!
//! P2P encrypted chat over two from-scratch primitives: knapsack-encrypted
//! half-keys establish a shared seed, and a deck-of-cards stream cipher
//! carries the conversation.
//!
//! ## Security model
//!
//! This is a demonstrator, not production cryptography:
//! - no authentication, forward secrecy, or replay protection
//! - the knapsack scheme is classically broken
//! - the deck cipher is a toy keystream
//!
//! Session state lives in RAM only and the deck is wiped on drop.

pub mod config;
mod error;
pub mod protocol;
mod session;
pub mod transport;

pub use config::ChatConfig;
pub use error::ChatError;
pub use protocol::{run_handshake, HandshakeState, WireMessage};
pub use session::{Role, Session};
