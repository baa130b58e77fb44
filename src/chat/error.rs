//! Chat error types.

use thiserror::Error;

use crate::crypto::KnapsackError;
use crate::directory::DirectoryError;

/// Errors that can occur while establishing or running a chat session.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Handshake failed with the given reason.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Knapsack encryption or decryption failed.
    #[error("knapsack error: {0}")]
    Knapsack(#[from] KnapsackError),

    /// Directory registration or lookup failed.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Wire serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
