//! Downstream services: pixel decoding and inference

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;
use crate::reassembly::EncodedFrame;

/// A decoded picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Raw pixel data in the decoder's output format
    pub pixels: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Turns encoded frames into pixels
///
/// One decoder is created per track, so implementations may keep reference
/// frames between calls. The pipeline runs `decode` on tokio's blocking pool,
/// so it may do CPU-heavy work without stalling other streams.
pub trait FrameDecoder: Send + 'static {
    /// Decode one complete frame
    ///
    /// Any error drops the frame; the pipeline keeps going. A panic ends the
    /// stream.
    fn decode(&mut self, frame: &EncodedFrame) -> Result<DecodedFrame>;
}

/// Client of the remote inference service
///
/// Shared by every pipeline of every session.
pub trait InferenceClient: Send + Sync + 'static {
    /// Run inference on one decoded frame and return the result text
    ///
    /// `timeout` is the deadline the pipeline enforces on the call; clients
    /// that talk RPC should forward it as the request deadline.
    fn infer(
        &self,
        frame: &DecodedFrame,
        timeout: Duration,
    ) -> impl Future<Output = Result<String>> + Send;
}
