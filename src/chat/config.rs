//! Chat configuration.

use crate::crypto::knapsack::DEFAULT_KEY_SIZE;

/// Default key directory service address.
pub const DEFAULT_KEYSERVER_ADDR: &str = "127.0.0.1:9000";

/// Settings for a chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Address of the key directory service.
    pub keyserver_addr: String,

    /// Number of knapsack elements in generated keys.
    pub key_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            keyserver_addr: DEFAULT_KEYSERVER_ADDR.to_string(),
            key_size: DEFAULT_KEY_SIZE,
        }
    }
}
