//! Chat protocol: wire frames and the handshake state machine.

mod handshake;
mod message;

pub use handshake::{run_handshake, HandshakeState, HALF_KEY_MAX, HALF_KEY_MIN};
pub use message::WireMessage;
