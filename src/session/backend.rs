//! Backend trait
//!
//! A backend plugs concrete collaborators into the relay: it builds one peer
//! engine per signaling connection and one decoder per video track, and
//! shares one inference client across everything.

use std::future::Future;
use std::sync::Arc;

use crate::codec::CodecKind;
use crate::error::Result;
use crate::pipeline::{FrameDecoder, InferenceClient};

use super::context::SessionContext;
use super::engine::{EngineConfig, PeerEngine};

/// Factory for a session's collaborators
///
/// # Example
///
/// ```ignore
/// struct MyBackend { inference: Arc<GrpcInference> }
///
/// impl Backend for MyBackend {
///     type Engine = WebRtcEngine;
///     type Decoder = FfmpegDecoder;
///     type Inference = GrpcInference;
///
///     async fn create_engine(&self, config: &EngineConfig, _ctx: &SessionContext) -> Result<WebRtcEngine> {
///         WebRtcEngine::new(&config.ice_servers).await
///     }
///
///     fn create_decoder(&self, codec: CodecKind) -> Result<FfmpegDecoder> {
///         FfmpegDecoder::new(codec)
///     }
///
///     fn inference(&self) -> Arc<GrpcInference> {
///         Arc::clone(&self.inference)
///     }
/// }
/// ```
pub trait Backend: Send + Sync + 'static {
    type Engine: PeerEngine;
    type Decoder: FrameDecoder;
    type Inference: InferenceClient;

    /// Build the peer engine for a new session
    fn create_engine(
        &self,
        config: &EngineConfig,
        ctx: &SessionContext,
    ) -> impl Future<Output = Result<Self::Engine>> + Send;

    /// Build a decoder for a video track
    fn create_decoder(&self, codec: CodecKind) -> Result<Self::Decoder>;

    /// Shared inference client
    fn inference(&self) -> Arc<Self::Inference>;
}
