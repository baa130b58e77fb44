//! Directory clients: the in-process map and the TCP-backed remote.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::chat::transport::{read_length_prefixed, write_length_prefixed};
use crate::crypto::PublicKey;

use super::{ClientId, DirectoryError, DirectoryRequest, DirectoryResponse, KeyDirectory};

/// In-process key directory.
///
/// Doubles as the server's storage and as the injected directory in
/// tests; entries never expire within the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    keys: HashMap<ClientId, PublicKey>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a key, overwriting any previous registration.
    pub fn insert(&mut self, client_id: ClientId, public_key: PublicKey) {
        self.keys.insert(client_id, public_key);
    }

    /// Reads a stored key.
    pub fn get(&self, client_id: ClientId) -> Option<&PublicKey> {
        self.keys.get(&client_id)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyDirectory for MemoryDirectory {
    async fn register(
        &mut self,
        client_id: ClientId,
        public_key: &PublicKey,
    ) -> Result<(), DirectoryError> {
        self.insert(client_id, public_key.clone());
        Ok(())
    }

    async fn lookup(&mut self, client_id: ClientId) -> Result<PublicKey, DirectoryError> {
        self.get(client_id)
            .cloned()
            .ok_or(DirectoryError::NotFound(client_id))
    }
}

/// Talks to a running [`super::KeyServer`] over TCP, one short-lived
/// connection per request.
#[derive(Debug, Clone)]
pub struct RemoteDirectory {
    server_addr: String,
}

impl RemoteDirectory {
    /// Points the client at a key server address.
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
        }
    }

    async fn request(
        &self,
        request: &DirectoryRequest,
    ) -> Result<DirectoryResponse, DirectoryError> {
        let mut stream = TcpStream::connect(&self.server_addr).await.map_err(|e| {
            DirectoryError::Transport(format!(
                "failed to connect to key server at {}: {e}",
                self.server_addr
            ))
        })?;

        let data = bincode::serialize(request)
            .map_err(|e| DirectoryError::Serialization(e.to_string()))?;
        write_length_prefixed(&mut stream, &data)
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        let raw = read_length_prefixed(&mut stream)
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;
        bincode::deserialize(&raw).map_err(|e| DirectoryError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl KeyDirectory for RemoteDirectory {
    async fn register(
        &mut self,
        client_id: ClientId,
        public_key: &PublicKey,
    ) -> Result<(), DirectoryError> {
        let request = DirectoryRequest::Register {
            client_id,
            public_key: public_key.clone(),
        };
        match self.request(&request).await? {
            DirectoryResponse::Registered => Ok(()),
            DirectoryResponse::Rejected { reason } => Err(DirectoryError::Rejected(reason)),
            other => Err(DirectoryError::Rejected(format!(
                "unexpected response: {other:?}"
            ))),
        }
    }

    async fn lookup(&mut self, client_id: ClientId) -> Result<PublicKey, DirectoryError> {
        let request = DirectoryRequest::Lookup { client_id };
        match self.request(&request).await? {
            DirectoryResponse::Key { public_key } => Ok(public_key),
            DirectoryResponse::NotFound { client_id } => Err(DirectoryError::NotFound(client_id)),
            DirectoryResponse::Rejected { reason } => Err(DirectoryError::Rejected(reason)),
            other => Err(DirectoryError::Rejected(format!(
                "unexpected response: {other:?}"
            ))),
        }
    }
}
