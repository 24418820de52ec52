//! Server configuration

use std::net::SocketAddr;

use crate::pipeline::PipelineConfig;
use crate::session::EngineConfig;

/// Environment variable overriding the listen port
pub const SIGNALING_PORT_ENV: &str = "SIGNALING_PORT";

/// Default listen port
pub const DEFAULT_SIGNALING_PORT: u16 = 8081;

/// Default WebSocket path
pub const DEFAULT_SIGNALING_PATH: &str = "/ws/signaling";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Request path WebSocket upgrades are accepted on
    pub signaling_path: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Peer engine options for every session
    pub engine: EngineConfig,

    /// Pipeline options for every video track
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_SIGNALING_PORT)),
            signaling_path: DEFAULT_SIGNALING_PATH.to_string(),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            engine: EngineConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Default config with the port taken from `SIGNALING_PORT`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(SIGNALING_PORT_ENV) {
            match value.trim().parse::<u16>() {
                Ok(port) => config.bind_addr.set_port(port),
                Err(_) => tracing::warn!(
                    value = %value,
                    default = DEFAULT_SIGNALING_PORT,
                    "Invalid SIGNALING_PORT, using default"
                ),
            }
        }
        config
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the WebSocket path
    pub fn signaling_path(mut self, path: impl Into<String>) -> Self {
        self.signaling_path = path.into();
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the engine configuration
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Set the pipeline configuration
    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }
}
