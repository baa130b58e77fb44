//! Key server: an accept loop serving register and lookup requests.
//!
//! One request per connection, mirroring how clients use it: connect,
//! send a frame, read the reply, hang up.

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::chat::transport::{read_length_prefixed, write_length_prefixed};

use super::{DirectoryError, DirectoryRequest, DirectoryResponse, MemoryDirectory};

/// The key directory server.
pub struct KeyServer {
    listener: TcpListener,
    keys: MemoryDirectory,
}

impl KeyServer {
    /// Binds the server socket.
    pub async fn bind(addr: &str) -> Result<Self, DirectoryError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "key server listening");
        Ok(Self {
            listener,
            keys: MemoryDirectory::new(),
        })
    }

    /// The bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, DirectoryError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves requests until the process ends.
    ///
    /// A failing connection is logged and dropped; the loop keeps going.
    pub async fn run(mut self) -> Result<(), DirectoryError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    if let Err(e) = self.serve_connection(stream).await {
                        error!(%peer, error = %e, "directory connection failed");
                    }
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }

    async fn serve_connection(&mut self, mut stream: TcpStream) -> Result<(), DirectoryError> {
        let raw = read_length_prefixed(&mut stream)
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        let response = match bincode::deserialize::<DirectoryRequest>(&raw) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!(error = %e, "malformed directory request");
                DirectoryResponse::Rejected {
                    reason: "malformed request".to_string(),
                }
            }
        };

        let data = bincode::serialize(&response)
            .map_err(|e| DirectoryError::Serialization(e.to_string()))?;
        write_length_prefixed(&mut stream, &data)
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;
        Ok(())
    }

    /// Applies one request to the key table.
    fn handle(&mut self, request: DirectoryRequest) -> DirectoryResponse {
        match request {
            DirectoryRequest::Register {
                client_id,
                public_key,
            } => {
                if public_key.is_empty() {
                    warn!(client_id, "register request with empty public key");
                    return DirectoryResponse::Rejected {
                        reason: "empty public key".to_string(),
                    };
                }
                self.keys.insert(client_id, public_key);
                info!(client_id, "public key registered");
                DirectoryResponse::Registered
            }
            DirectoryRequest::Lookup { client_id } => match self.keys.get(client_id) {
                Some(public_key) => {
                    info!(client_id, "public key retrieved");
                    DirectoryResponse::Key {
                        public_key: public_key.clone(),
                    }
                }
                None => {
                    info!(client_id, "lookup for unknown client");
                    DirectoryResponse::NotFound { client_id }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::crypto::generate_keys;
    use crate::directory::{KeyDirectory, RemoteDirectory};

    async fn test_server() -> KeyServer {
        KeyServer::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn test_handle_register_and_lookup() {
        let mut server = test_server().await;
        let (_, public) = generate_keys(8, &mut StdRng::seed_from_u64(1)).unwrap();

        let response = server.handle(DirectoryRequest::Register {
            client_id: 4000,
            public_key: public.clone(),
        });
        assert!(matches!(response, DirectoryResponse::Registered));

        match server.handle(DirectoryRequest::Lookup { client_id: 4000 }) {
            DirectoryResponse::Key { public_key } => assert_eq!(public_key, public),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_lookup_unknown() {
        let mut server = test_server().await;
        assert!(matches!(
            server.handle(DirectoryRequest::Lookup { client_id: 4001 }),
            DirectoryResponse::NotFound { client_id: 4001 }
        ));
    }

    #[tokio::test]
    async fn test_handle_overwrites_registration() {
        let mut server = test_server().await;
        let (_, first) = generate_keys(8, &mut StdRng::seed_from_u64(2)).unwrap();
        let (_, second) = generate_keys(8, &mut StdRng::seed_from_u64(3)).unwrap();

        server.handle(DirectoryRequest::Register {
            client_id: 4000,
            public_key: first,
        });
        server.handle(DirectoryRequest::Register {
            client_id: 4000,
            public_key: second.clone(),
        });

        match server.handle(DirectoryRequest::Lookup { client_id: 4000 }) {
            DirectoryResponse::Key { public_key } => assert_eq!(public_key, second),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_served_over_tcp() {
        let server = test_server().await;
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        let (_, public) = generate_keys(8, &mut StdRng::seed_from_u64(4)).unwrap();
        let mut directory = RemoteDirectory::new(addr.to_string());

        directory.register(4000, &public).await.unwrap();
        assert_eq!(directory.lookup(4000).await.unwrap(), public);
        assert!(matches!(
            directory.lookup(4001).await,
            Err(DirectoryError::NotFound(4001))
        ));
    }

    #[tokio::test]
    async fn test_malformed_request_rejected() {
        let server = test_server().await;
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        write_length_prefixed(&mut stream, b"not bincode at all")
            .await
            .unwrap();

        let raw = read_length_prefixed(&mut stream).await.unwrap();
        match bincode::deserialize::<DirectoryResponse>(&raw).unwrap() {
            DirectoryResponse::Rejected { .. } => {}
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
