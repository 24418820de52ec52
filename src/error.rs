//! Error types
//!
//! Errors are grouped by where they are recovered:
//! - [`MediaError`]: a single RTP packet could not be depacketized (packet dropped)
//! - [`StreamError`]: per-frame or per-stream failures inside a dispatch pipeline
//! - [`SignalingError`]: bad or undeliverable signaling messages
//! - [`EngineError`]: failures reported by the peer-connection engine

use std::fmt;
use std::time::Duration;

use crate::reassembly::StreamId;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error (sockets, listener)
    Io(std::io::Error),
    /// Malformed RTP packet or codec payload
    Media(MediaError),
    /// Frame dispatch failure
    Stream(StreamError),
    /// Signaling channel failure
    Signaling(SignalingError),
    /// Peer-connection engine failure
    Engine(EngineError),
}

impl Error {
    /// Whether this error ends the stream that produced it.
    ///
    /// Malformed packets and undecodable frames are dropped and the stream
    /// keeps running; overflow and inference failures stop the stream.
    pub fn is_stream_fatal(&self) -> bool {
        match self {
            Error::Stream(e) => e.is_fatal(),
            Error::Media(_) | Error::Signaling(_) => false,
            Error::Io(_) | Error::Engine(_) => true,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Media(e) => write!(f, "Media error: {}", e),
            Error::Stream(e) => write!(f, "Stream error: {}", e),
            Error::Signaling(e) => write!(f, "Signaling error: {}", e),
            Error::Engine(e) => write!(f, "Engine error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Media(e) => Some(e),
            Error::Stream(e) => Some(e),
            Error::Signaling(e) => Some(e),
            Error::Engine(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<MediaError> for Error {
    fn from(e: MediaError) -> Self {
        Error::Media(e)
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Error::Stream(e)
    }
}

impl From<SignalingError> for Error {
    fn from(e: SignalingError) -> Self {
        Error::Signaling(e)
    }
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        Error::Engine(e)
    }
}

/// RTP and codec payload errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Packet shorter than the header it claims to carry
    ShortPacket,
    /// RTP version field was not 2
    UnsupportedRtpVersion(u8),
    /// Padding length exceeds the payload
    InvalidPadding,
    /// Empty payload where the codec requires data
    EmptyPayload,
    /// VP8 payload descriptor is truncated or inconsistent
    InvalidVp8Descriptor,
    /// VP9 payload descriptor is truncated or inconsistent
    InvalidVp9Descriptor,
    /// H.264 NAL unit type that the depacketizer does not handle
    UnsupportedNaluType(u8),
    /// STAP-A aggregate whose length fields overrun the payload
    InvalidStapA,
    /// FU-A continuation or end fragment without a start fragment
    FragmentWithoutStart,
    /// H.265 packet with the forbidden zero bit set
    ForbiddenBitSet,
    /// H.265 NAL unit type that the depacketizer does not handle
    UnsupportedH265Type(u8),
    /// H.265 aggregation packet whose length fields overrun the payload
    InvalidAggregation,
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::ShortPacket => write!(f, "Packet too short"),
            MediaError::UnsupportedRtpVersion(v) => write!(f, "Unsupported RTP version: {}", v),
            MediaError::InvalidPadding => write!(f, "Invalid RTP padding"),
            MediaError::EmptyPayload => write!(f, "Empty payload"),
            MediaError::InvalidVp8Descriptor => write!(f, "Invalid VP8 payload descriptor"),
            MediaError::InvalidVp9Descriptor => write!(f, "Invalid VP9 payload descriptor"),
            MediaError::UnsupportedNaluType(t) => write!(f, "Unsupported H.264 NAL unit type: {}", t),
            MediaError::InvalidStapA => write!(f, "Invalid STAP-A packet"),
            MediaError::FragmentWithoutStart => write!(f, "Fragment received without start fragment"),
            MediaError::ForbiddenBitSet => write!(f, "H.265 forbidden zero bit set"),
            MediaError::UnsupportedH265Type(t) => write!(f, "Unsupported H.265 NAL unit type: {}", t),
            MediaError::InvalidAggregation => write!(f, "Invalid H.265 aggregation packet"),
        }
    }
}

impl std::error::Error for MediaError {}

/// Failures inside a frame dispatch pipeline
#[derive(Debug)]
pub enum StreamError {
    /// A stream accumulated more than the allowed bytes without a marker bit
    BufferOverflow {
        /// Stream that overflowed
        stream_id: StreamId,
        /// Configured limit in bytes
        limit: usize,
    },
    /// The frame decoder rejected a frame
    DecodeFailed(String),
    /// The frame decoder panicked and is gone
    DecoderLost(String),
    /// The inference call did not complete in time
    InferenceTimeout(Duration),
    /// The inference transport failed
    Inference(String),
    /// The track source failed while reading
    Source(String),
}

impl StreamError {
    /// Whether this error ends the stream
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StreamError::DecodeFailed(_))
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::BufferOverflow { stream_id, limit } => {
                write!(f, "Stream {} exceeded {} bytes without a frame boundary", stream_id, limit)
            }
            StreamError::DecodeFailed(msg) => write!(f, "Decode failed: {}", msg),
            StreamError::DecoderLost(msg) => write!(f, "Decoder lost: {}", msg),
            StreamError::InferenceTimeout(d) => {
                write!(f, "Inference timed out after {}ms", d.as_millis())
            }
            StreamError::Inference(msg) => write!(f, "Inference failed: {}", msg),
            StreamError::Source(msg) => write!(f, "Track read failed: {}", msg),
        }
    }
}

impl std::error::Error for StreamError {}

/// Signaling errors
#[derive(Debug)]
pub enum SignalingError {
    /// Inbound message was not valid JSON or had an unknown type
    InvalidMessage(String),
    /// A message type that is only valid in the other direction
    UnexpectedMessage(&'static str),
    /// The signaling transport failed
    Transport(String),
    /// The signaling channel was closed
    Closed,
}

impl fmt::Display for SignalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalingError::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            SignalingError::UnexpectedMessage(kind) => write!(f, "Unexpected message: {}", kind),
            SignalingError::Transport(msg) => write!(f, "Transport error: {}", msg),
            SignalingError::Closed => write!(f, "Channel closed"),
        }
    }
}

impl std::error::Error for SignalingError {}

impl From<serde_json::Error> for SignalingError {
    fn from(e: serde_json::Error) -> Self {
        SignalingError::InvalidMessage(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SignalingError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        match e {
            tokio_tungstenite::tungstenite::Error::ConnectionClosed
            | tokio_tungstenite::tungstenite::Error::AlreadyClosed => SignalingError::Closed,
            other => SignalingError::Transport(other.to_string()),
        }
    }
}

/// Peer-connection engine errors
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Engine could not be created
    Create(String),
    /// Remote description rejected
    RemoteDescription(String),
    /// Answer generation or local description failed
    LocalDescription(String),
    /// ICE candidate rejected
    IceCandidate(String),
    /// Engine shutdown failed
    Close(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Create(msg) => write!(f, "Failed to create peer connection: {}", msg),
            EngineError::RemoteDescription(msg) => {
                write!(f, "Failed to set remote description: {}", msg)
            }
            EngineError::LocalDescription(msg) => {
                write!(f, "Failed to set local description: {}", msg)
            }
            EngineError::IceCandidate(msg) => write!(f, "Failed to add ICE candidate: {}", msg),
            EngineError::Close(msg) => write!(f, "Failed to close peer connection: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}
