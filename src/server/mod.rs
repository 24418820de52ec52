//! WebSocket signaling server
//!
//! Accepts client connections on the signaling path and runs one
//! [`crate::session::Session`] per connection.

pub mod config;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_SIGNALING_PATH, DEFAULT_SIGNALING_PORT, SIGNALING_PORT_ENV};
pub use listener::RelayServer;
