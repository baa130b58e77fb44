//! Wire message types for the chat protocol.
//!
//! These are what actually crosses the socket, bincode-serialized and
//! length-prefixed by the transport. Handshake frames carry knapsack
//! ciphertext (one integer per plaintext byte); chat frames carry
//! deck-cipher bytes.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// A complete frame as sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireMessage {
    /// The dialer's self-introduction: its client id, knapsack-encrypted
    /// to the listener's public key.
    Init { ciphertext: Vec<BigUint> },

    /// The listener's acknowledgement, knapsack-encrypted to the dialer's
    /// public key.
    Ack { ciphertext: Vec<BigUint> },

    /// One peer's half-key contribution, knapsack-encrypted.
    HalfKey { ciphertext: Vec<BigUint> },

    /// A chat payload, encrypted with the session's deck cipher.
    Chat { payload: Vec<u8> },

    /// Orderly end of the conversation.
    Close,
}

impl WireMessage {
    /// Serialize to bytes for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Frame name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Init { .. } => "init",
            WireMessage::Ack { .. } => "ack",
            WireMessage::HalfKey { .. } => "half-key",
            WireMessage::Chat { .. } => "chat",
            WireMessage::Close => "close",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_frame_roundtrip() {
        let frame = WireMessage::HalfKey {
            ciphertext: vec![BigUint::from(123u32), BigUint::from(98765432109876u64)],
        };

        let bytes = frame.to_bytes().unwrap();
        let decoded = WireMessage::from_bytes(&bytes).unwrap();

        match decoded {
            WireMessage::HalfKey { ciphertext } => {
                assert_eq!(ciphertext[0], BigUint::from(123u32));
                assert_eq!(ciphertext[1], BigUint::from(98765432109876u64));
            }
            other => panic!("wrong frame: {}", other.kind()),
        }
    }

    #[test]
    fn test_chat_frame_roundtrip() {
        let frame = WireMessage::Chat {
            payload: vec![1, 2, 3, 255],
        };

        let bytes = frame.to_bytes().unwrap();
        match WireMessage::from_bytes(&bytes).unwrap() {
            WireMessage::Chat { payload } => assert_eq!(payload, vec![1, 2, 3, 255]),
            other => panic!("wrong frame: {}", other.kind()),
        }
    }

    #[test]
    fn test_close_frame_roundtrip() {
        let bytes = WireMessage::Close.to_bytes().unwrap();
        assert!(matches!(
            WireMessage::from_bytes(&bytes).unwrap(),
            WireMessage::Close
        ));
    }

    #[test]
    fn test_frame_kinds() {
        assert_eq!(WireMessage::Close.kind(), "close");
        assert_eq!(
            WireMessage::Chat { payload: vec![] }.kind(),
            "chat"
        );
    }
}
