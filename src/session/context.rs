//! Session context
//!
//! Identity of a signaling connection, handed to the backend when it builds
//! the session's peer engine.

use std::net::SocketAddr;

/// Context describing one signaling connection
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Request path the WebSocket was opened on
    pub path: String,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr,
            path: String::new(),
        }
    }

    /// Record the request path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}
