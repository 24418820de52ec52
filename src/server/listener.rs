//! Signaling server listener
//!
//! Handles the TCP accept loop, upgrades connections on the signaling path
//! to WebSocket and spawns one session per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::error::{Result, SignalingError};
use crate::server::config::ServerConfig;
use crate::session::{Backend, Session, SessionContext};

/// WebSocket signaling server
pub struct RelayServer<B: Backend> {
    config: ServerConfig,
    backend: Arc<B>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<B: Backend> RelayServer<B> {
    /// Create a new server with the given configuration and backend
    pub fn new(config: ServerConfig, backend: B) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            backend: Arc::new(backend),
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the backend
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            path = %self.config.signaling_path,
            "Signaling server listening"
        );

        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            addr = %listener.local_addr()?,
            path = %self.config.signaling_path,
            "Signaling server listening"
        );

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit: Option<OwnedSemaphorePermit> = match self.connection_semaphore {
            Some(ref sem) => match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            },
            None => None,
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(session_id = session_id, peer = %peer_addr, "New connection");

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let config = self.config.clone();
        let backend = Arc::clone(&self.backend);

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = serve_connection(session_id, socket, peer_addr, config, backend).await {
                tracing::debug!(session_id = session_id, error = %e, "Connection error");
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

/// Upgrade one connection and run its session to completion
async fn serve_connection<B: Backend>(
    session_id: u64,
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: ServerConfig,
    backend: Arc<B>,
) -> Result<()> {
    let expected_path = config.signaling_path.as_str();
    let ws = tokio_tungstenite::accept_hdr_async(socket, |req: &Request, resp: Response| {
        if req.uri().path() == expected_path {
            return Ok(resp);
        }
        tracing::debug!(session_id = session_id, path = %req.uri().path(), "Upgrade on unknown path");
        let mut err = ErrorResponse::new(Some("Not Found".to_string()));
        *err.status_mut() = StatusCode::NOT_FOUND;
        Err(err)
    })
    .await
    .map_err(SignalingError::from)?;

    let (sink, source) = ws.split();
    let ctx = SessionContext::new(session_id, peer_addr).with_path(expected_path);
    let session = Session::new(ctx, backend, &config.engine, config.pipeline.clone()).await?;
    let stats = session.run(sink, source).await?;

    tracing::debug!(
        session_id = session_id,
        messages = stats.messages_received,
        streams = stats.streams_started,
        "Session stats"
    );
    Ok(())
}
