//! Handshake protocol for establishing a chat session.
//!
//! Each peer has already registered its knapsack public key with the
//! directory. The exchange then runs:
//!
//! 1. The initiator looks up the responder's public key and introduces
//!    itself with an encrypted `Init` carrying its client id.
//! 2. The responder decrypts the id, looks up the initiator's public key,
//!    and answers with an encrypted `Ack`.
//! 3. Both sides draw a random half-key and send it knapsack-encrypted
//!    to the peer; the initiator sends first, the responder answers.
//! 4. The product of the two half-keys seeds the deck cipher on both
//!    sides and the session goes active.
//!
//! Any decryption or transport failure aborts straight to `Closed` and
//! surfaces as a [`ChatError`]; nothing of the session survives.

use rand::Rng;
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::chat::error::ChatError;
use crate::chat::protocol::message::WireMessage;
use crate::chat::session::{Role, Session};
use crate::chat::transport::MessageTransport;
use crate::crypto::knapsack::{self, PrivateKey, PublicKey};
use crate::directory::{ClientId, KeyDirectory};

/// Inclusive lower bound for a half-key draw.
pub const HALF_KEY_MIN: u64 = 10_000;

/// Inclusive upper bound for a half-key draw.
pub const HALF_KEY_MAX: u64 = 9_999_999;

/// Plaintext carried by an `Ack` frame.
const ACK: &[u8] = b"ok";

/// Handshake progress, from first contact to an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingPeerKey,
    HalfKeySent,
    HalfKeyReceived,
    SessionActive,
    Closed,
}

/// Runs the handshake to completion and returns the established session.
///
/// `peer_id` must be given by the initiator; the responder learns it from
/// the `Init` frame. The directory, transport, and randomness source are
/// all injected so tests can run fully in-process. On failure the state
/// machine lands in `Closed` and the caller decides whether to dial
/// again; no retry happens here.
pub async fn run_handshake<D, T, R>(
    role: Role,
    local_id: ClientId,
    peer_id: Option<ClientId>,
    private_key: &PrivateKey,
    directory: &mut D,
    transport: &mut T,
    rng: &mut R,
) -> Result<Session, ChatError>
where
    D: KeyDirectory,
    T: MessageTransport,
    R: Rng + ?Sized,
{
    let mut state = HandshakeState::Idle;
    let result = drive(
        role,
        local_id,
        peer_id,
        private_key,
        directory,
        transport,
        rng,
        &mut state,
    )
    .await;

    if let Err(error) = &result {
        state = HandshakeState::Closed;
        debug!(?state, %error, "handshake aborted");
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn drive<D, T, R>(
    role: Role,
    local_id: ClientId,
    peer_id: Option<ClientId>,
    private_key: &PrivateKey,
    directory: &mut D,
    transport: &mut T,
    rng: &mut R,
    state: &mut HandshakeState,
) -> Result<Session, ChatError>
where
    D: KeyDirectory,
    T: MessageTransport,
    R: Rng + ?Sized,
{
    *state = HandshakeState::AwaitingPeerKey;
    debug!(?state, ?role, local_id, "handshake started");

    let (peer_id, peer_key) = match role {
        Role::Initiator => {
            let peer_id = peer_id
                .ok_or_else(|| ChatError::Handshake("initiator needs a peer id".to_string()))?;
            let peer_key = directory.lookup(peer_id).await?;
            debug!(peer = peer_id, "peer public key retrieved");

            let ciphertext = knapsack::encrypt(&local_id.to_be_bytes(), &peer_key)?;
            transport.send(&WireMessage::Init { ciphertext }).await?;

            let ciphertext = match transport.receive().await? {
                WireMessage::Ack { ciphertext } => ciphertext,
                other => return Err(unexpected_frame("ack", &other)),
            };
            let ack = knapsack::decrypt(&ciphertext, private_key)
                .map_err(|e| ChatError::Handshake(format!("ack did not decrypt: {e}")))?;
            if ack != ACK {
                return Err(ChatError::Handshake(
                    "peer rejected the handshake".to_string(),
                ));
            }
            (peer_id, peer_key)
        }
        Role::Responder => {
            let ciphertext = match transport.receive().await? {
                WireMessage::Init { ciphertext } => ciphertext,
                other => return Err(unexpected_frame("init", &other)),
            };
            let id_bytes = knapsack::decrypt(&ciphertext, private_key).map_err(|e| {
                ChatError::Handshake(format!("peer introduction did not decrypt: {e}"))
            })?;
            let peer_id = parse_client_id(&id_bytes)?;
            let peer_key = directory.lookup(peer_id).await?;
            debug!(peer = peer_id, "peer public key retrieved");

            let ciphertext = knapsack::encrypt(ACK, &peer_key)?;
            transport.send(&WireMessage::Ack { ciphertext }).await?;
            (peer_id, peer_key)
        }
    };

    let mut half_key = rng.gen_range(HALF_KEY_MIN..=HALF_KEY_MAX);

    // the initiator speaks first here, exactly as in the chat loop
    let mut peer_half_key = match role {
        Role::Initiator => {
            send_half_key(transport, &peer_key, half_key).await?;
            *state = HandshakeState::HalfKeySent;
            debug!(?state, "half key sent");
            receive_half_key(transport, private_key).await?
        }
        Role::Responder => {
            let peer_half_key = receive_half_key(transport, private_key).await?;
            send_half_key(transport, &peer_key, half_key).await?;
            *state = HandshakeState::HalfKeySent;
            debug!(?state, "half key sent");
            peer_half_key
        }
    };
    *state = HandshakeState::HalfKeyReceived;
    debug!(?state, "peer half key received");

    // both sides compute the same product, which seeds the deck
    let mut seed = half_key * peer_half_key;
    let mut seed_bytes = seed.to_be_bytes();
    let session = Session::new(peer_id, role, &seed_bytes);

    half_key.zeroize();
    peer_half_key.zeroize();
    seed.zeroize();
    seed_bytes.zeroize();

    *state = HandshakeState::SessionActive;
    info!(?state, peer = peer_id, ?role, "session established");
    Ok(session)
}

async fn send_half_key<T>(
    transport: &mut T,
    peer_key: &PublicKey,
    half_key: u64,
) -> Result<(), ChatError>
where
    T: MessageTransport,
{
    let mut bytes = half_key.to_be_bytes();
    let ciphertext = knapsack::encrypt(&bytes, peer_key)?;
    bytes.zeroize();
    transport.send(&WireMessage::HalfKey { ciphertext }).await
}

async fn receive_half_key<T>(transport: &mut T, private_key: &PrivateKey) -> Result<u64, ChatError>
where
    T: MessageTransport,
{
    let ciphertext = match transport.receive().await? {
        WireMessage::HalfKey { ciphertext } => ciphertext,
        other => return Err(unexpected_frame("half-key", &other)),
    };
    let mut bytes = knapsack::decrypt(&ciphertext, private_key)
        .map_err(|e| ChatError::Handshake(format!("half key did not decrypt: {e}")))?;
    if bytes.len() != 8 {
        let len = bytes.len();
        bytes.zeroize();
        return Err(ChatError::Handshake(format!(
            "half key must be 8 bytes, got {len}"
        )));
    }
    let value = u64::from_be_bytes(bytes[..8].try_into().expect("length checked above"));
    bytes.zeroize();
    Ok(value)
}

fn parse_client_id(bytes: &[u8]) -> Result<ClientId, ChatError> {
    let raw: [u8; 2] = bytes.try_into().map_err(|_| {
        ChatError::Handshake(format!("client id must be 2 bytes, got {}", bytes.len()))
    })?;
    Ok(ClientId::from_be_bytes(raw))
}

fn unexpected_frame(expected: &str, got: &WireMessage) -> ChatError {
    ChatError::Handshake(format!(
        "expected a {expected} frame, got {}",
        got.kind()
    ))
}
