use serde::{Deserialize, Serialize};

/// Server settings. Every field has a default, so a partial config file
/// deserializes cleanly.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Connections served at once; further accepts wait for a free slot.
    pub max_connections: usize,

    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,

    /// Largest request line plus headers accepted, in bytes.
    pub max_header_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 256,
            max_body_size: 10 * 1024 * 1024,
            max_header_size: 8 * 1024,
        }
    }
}
