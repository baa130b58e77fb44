//! TCP transport for chat connections.
//!
//! Peers connect directly to each other's listening port; the port
//! doubles as the client id registered with the key directory.

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener as TokioTcpListener, TcpStream, ToSocketAddrs};

use crate::chat::error::ChatError;
use crate::chat::protocol::WireMessage;
use crate::chat::transport::{read_length_prefixed, write_length_prefixed, MessageTransport};

/// TCP connection wrapper using tokio.
pub struct TcpConnection {
    reader: BufReader<tokio::io::ReadHalf<TcpStream>>,
    writer: BufWriter<tokio::io::WriteHalf<TcpStream>>,
    peer_addr: String,
}

impl TcpConnection {
    /// Create a new TCP connection from a stream.
    pub fn new(stream: TcpStream) -> Self {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let (read_half, write_half) = tokio::io::split(stream);

        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            peer_addr,
        }
    }

    /// Connect to a remote address.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ChatError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ChatError::Transport(format!("failed to connect: {}", e)))?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl MessageTransport for TcpConnection {
    async fn send(&mut self, message: &WireMessage) -> Result<(), ChatError> {
        let data = message
            .to_bytes()
            .map_err(|e| ChatError::Serialization(e.to_string()))?;
        write_length_prefixed(&mut self.writer, &data).await
    }

    async fn receive(&mut self) -> Result<WireMessage, ChatError> {
        let data = read_length_prefixed(&mut self.reader).await?;
        WireMessage::from_bytes(&data).map_err(|e| ChatError::Serialization(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    fn peer_addr(&self) -> Result<String, ChatError> {
        Ok(self.peer_addr.clone())
    }
}

/// TCP listener for accepting chat connections using tokio.
pub struct TcpListener {
    listener: TokioTcpListener,
}

impl TcpListener {
    /// Bind to an address and start listening.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, ChatError> {
        let listener = TokioTcpListener::bind(addr)
            .await
            .map_err(|e| ChatError::Transport(format!("failed to bind: {}", e)))?;
        Ok(Self { listener })
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<TcpConnection, ChatError> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| ChatError::Transport(format!("failed to accept: {}", e)))?;
        Ok(TcpConnection::new(stream))
    }

    /// Get the local address.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ChatError> {
        self.listener
            .local_addr()
            .map_err(|e| ChatError::Transport(format!("failed to get local addr: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tcp_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut conn = TcpConnection::connect(addr).await.unwrap();

            let msg = WireMessage::Chat {
                payload: vec![1, 2, 3],
            };
            conn.send(&msg).await.unwrap();

            let response = conn.receive().await.unwrap();
            match response {
                WireMessage::Chat { payload } => assert_eq!(payload, vec![4, 5, 6]),
                other => panic!("wrong frame: {}", other.kind()),
            }

            conn.close().await.unwrap();
        });

        let mut server_conn = listener.accept().await.unwrap();

        match server_conn.receive().await.unwrap() {
            WireMessage::Chat { payload } => assert_eq!(payload, vec![1, 2, 3]),
            other => panic!("wrong frame: {}", other.kind()),
        }

        let response = WireMessage::Chat {
            payload: vec![4, 5, 6],
        };
        server_conn.send(&response).await.unwrap();

        client_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_multiple_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut conn = TcpConnection::connect(addr).await.unwrap();

            for i in 0..10u8 {
                let msg = WireMessage::Chat { payload: vec![i] };
                conn.send(&msg).await.unwrap();
            }

            conn.close().await.unwrap();
        });

        let mut server_conn = listener.accept().await.unwrap();

        for i in 0..10u8 {
            match server_conn.receive().await.unwrap() {
                WireMessage::Chat { payload } => assert_eq!(payload, vec![i]),
                other => panic!("wrong frame: {}", other.kind()),
            }
        }

        client_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_hangup() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut conn = TcpConnection::connect(addr).await.unwrap();
            conn.close().await.unwrap();
        });

        let mut server_conn = listener.accept().await.unwrap();
        client_task.await.unwrap();

        match server_conn.receive().await {
            Err(ChatError::ConnectionClosed) => {}
            other => panic!("expected connection closed, got {:?}", other.map(|m| m.kind())),
        }
    }
}
