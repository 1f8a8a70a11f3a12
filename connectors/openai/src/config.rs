//! Configuration for the HTTP transport

use serde::{Deserialize, Serialize};

/// reqwest client configuration
///
/// No overall request timeout is applied. A hung exchange ends when the
/// owning task is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Time allowed to establish the TCP/TLS connection
    pub connect_timeout_ms: Option<u64>,
    /// `User-Agent` header value
    pub user_agent: String,
}

impl TransportConfig {
    pub fn new() -> Self {
        Self {
            connect_timeout_ms: None,
            user_agent: format!("promptwire/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, connect_timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(connect_timeout_ms);
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}
