//! Peer-connection engine abstraction
//!
//! The relay does not negotiate media itself. It drives an engine (a WebRTC
//! stack) through offer/answer and ICE, and receives the engine's inbound
//! tracks and local candidates through registered handlers. Handlers may be
//! invoked from engine threads at any time, so the session only ever gives
//! the engine closures that push an [`EngineEvent`] into a channel.

use std::future::Future;

use crate::error::EngineError;
use crate::pipeline::TrackSource;
use crate::signaling::{IceCandidateInit, SessionDescription};

/// Default public STUN server
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Handler for inbound tracks
pub type TrackHandler<T> = Box<dyn Fn(T) + Send + Sync>;

/// Handler for locally gathered ICE candidates; `None` ends gathering
pub type CandidateHandler = Box<dyn Fn(Option<IceCandidateInit>) + Send + Sync>;

/// Configuration handed to the engine on creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// ICE server URLs
    pub ice_servers: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }
}

impl EngineConfig {
    /// Add an ICE server
    pub fn ice_server(mut self, url: impl Into<String>) -> Self {
        self.ice_servers.push(url.into());
        self
    }

    /// Replace the ICE server list
    pub fn ice_servers<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ice_servers = urls.into_iter().map(Into::into).collect();
        self
    }
}

/// Something the engine reported through a handler
#[derive(Debug)]
pub enum EngineEvent<T> {
    /// A remote track started
    Track(T),
    /// A local ICE candidate was gathered
    LocalCandidate(IceCandidateInit),
}

/// Peer-connection engine for one session
pub trait PeerEngine: Send + Sync + 'static {
    /// Inbound track type
    type Track: TrackSource;

    /// Apply the remote offer
    fn set_remote_description(
        &self,
        offer: SessionDescription,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Create an answer for the applied offer
    fn create_answer(&self) -> impl Future<Output = Result<SessionDescription, EngineError>> + Send;

    /// Apply the local answer
    fn set_local_description(
        &self,
        answer: SessionDescription,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Add a remote ICE candidate
    fn add_ice_candidate(
        &self,
        candidate: IceCandidateInit,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Close the peer connection
    fn close(&self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Register the handler for local ICE candidates
    fn on_ice_candidate(&self, handler: CandidateHandler);

    /// Register the handler for inbound tracks
    fn on_track(&self, handler: TrackHandler<Self::Track>);
}
