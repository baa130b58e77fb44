//! Key directory service: register and look up knapsack public keys by
//! client id.
//!
//! The directory is the only discovery mechanism peers have; nothing is
//! pre-shared. A client registers its public key under its listening
//! port, and anyone can look that key up to start a handshake.

mod client;
mod server;

pub use client::{MemoryDirectory, RemoteDirectory};
pub use server::KeyServer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::PublicKey;

/// Client identifier: the TCP port the client chats on.
pub type ClientId = u16;

/// Errors from directory operations.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// No public key is registered for this client.
    #[error("no public key registered for client {0}")]
    NotFound(ClientId),

    /// The directory refused the request.
    #[error("directory rejected the request: {0}")]
    Rejected(String),

    /// Could not reach or talk to the directory.
    #[error("directory transport error: {0}")]
    Transport(String),

    /// Request or response encoding failed.
    #[error("directory serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Requests understood by the key server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DirectoryRequest {
    /// Publish (or overwrite) the public key for `client_id`.
    Register {
        client_id: ClientId,
        public_key: PublicKey,
    },

    /// Fetch the public key registered for `client_id`.
    Lookup { client_id: ClientId },
}

/// Responses from the key server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DirectoryResponse {
    /// Registration accepted.
    Registered,

    /// The key registered for the requested client.
    Key { public_key: PublicKey },

    /// No registration exists for the requested client.
    NotFound { client_id: ClientId },

    /// The request was malformed or refused.
    Rejected { reason: String },
}

/// Where public keys come from during a handshake.
///
/// Implementations: [`MemoryDirectory`] for in-process use and tests,
/// [`RemoteDirectory`] for a running [`KeyServer`].
#[async_trait]
pub trait KeyDirectory: Send {
    /// Publishes `public_key` under `client_id`, overwriting any previous
    /// registration.
    async fn register(
        &mut self,
        client_id: ClientId,
        public_key: &PublicKey,
    ) -> Result<(), DirectoryError>;

    /// Returns the public key registered for `client_id`.
    async fn lookup(&mut self, client_id: ClientId) -> Result<PublicKey, DirectoryError>;
}
