//! Transport layer for chat connections.
//!
//! This module defines the async transport trait, length-prefixed framing
//! helpers shared with the directory protocol, and the TCP implementation.

mod tcp;

pub use tcp::{TcpConnection, TcpListener};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::chat::error::ChatError;
use crate::chat::protocol::WireMessage;

/// Upper bound on a single frame; knapsack handshake frames are a few
/// kilobytes at most and chat payloads are line-sized.
const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Trait for bidirectional async message transport.
#[async_trait]
pub trait MessageTransport: Send {
    /// Send a wire message.
    async fn send(&mut self, message: &WireMessage) -> Result<(), ChatError>;

    /// Receive a wire message.
    async fn receive(&mut self) -> Result<WireMessage, ChatError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), ChatError>;

    /// Get the peer address as a string.
    fn peer_addr(&self) -> Result<String, ChatError>;
}

/// Helper to write a length-prefixed frame asynchronously.
pub async fn write_length_prefixed<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ChatError> {
    let len = data.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Helper to read a length-prefixed frame asynchronously.
///
/// A clean EOF before the length prefix reads as the peer hanging up.
pub async fn read_length_prefixed<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ChatError> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ChatError::ConnectionClosed
        } else {
            ChatError::Io(e)
        }
    })?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_FRAME_LEN {
        return Err(ChatError::Transport(format!(
            "frame too large: {} bytes",
            len
        )));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_length_prefixed_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_length_prefixed(&mut client, b"hello frame").await.unwrap();
        let frame = read_length_prefixed(&mut server).await.unwrap();
        assert_eq!(frame, b"hello frame");
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let (mut client, mut server) = tokio::io::duplex(64);

        write_length_prefixed(&mut client, b"").await.unwrap();
        let frame = read_length_prefixed(&mut server).await.unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let len = (MAX_FRAME_LEN as u32 + 1).to_le_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut client, &len)
            .await
            .unwrap();

        match read_length_prefixed(&mut server).await {
            Err(ChatError::Transport(_)) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_eof_reads_as_connection_closed() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        match read_length_prefixed(&mut server).await {
            Err(ChatError::ConnectionClosed) => {}
            other => panic!("expected connection closed, got {other:?}"),
        }
    }
}
