//! Live chat session state.

use crate::crypto::StreamCipher;
use crate::directory::ClientId;

/// Role in the chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Dialed the peer.
    Initiator,
    /// Accepted the connection.
    Responder,
}

/// An established session: the peer's identity plus the live deck cipher.
///
/// Both peers run one shared keystream and the conversation strictly
/// alternates, so the decks advance in the same global order. The deck
/// mutates on every transform and may not be shared across concurrent
/// callers; the session owns it exclusively. Dropping the session wipes
/// the deck.
pub struct Session {
    peer_id: ClientId,
    role: Role,
    cipher: StreamCipher,
}

impl Session {
    /// Creates a session keyed by the combined half-key seed.
    pub fn new(peer_id: ClientId, role: Role, seed: &[u8]) -> Self {
        Self {
            peer_id,
            role,
            cipher: StreamCipher::from_seed(seed),
        }
    }

    /// The peer's client id.
    pub fn peer_id(&self) -> ClientId {
        self.peer_id
    }

    /// This side's role in the session.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Encrypts an outgoing payload, advancing the deck once per byte.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        self.cipher.encrypt(plaintext)
    }

    /// Decrypts an incoming payload, advancing the deck once per byte.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Vec<u8> {
        self.cipher.decrypt(ciphertext)
    }

    /// Ends the session; the deck state is discarded, not persisted.
    pub fn close(self) {}
}
