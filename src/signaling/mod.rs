//! Client-facing signaling
//!
//! This module provides:
//! - JSON message types (`offer`, `answer`, `candidate`, `text`)
//! - Transport traits with WebSocket and channel implementations
//! - The serialized outbound writer shared within a session

pub mod channel;
pub mod message;
pub mod writer;

pub use channel::{SignalingSink, SignalingSource};
pub use message::{IceCandidateInit, SdpType, SessionDescription, SignalMessage, TextPayload};
pub use writer::SignalWriter;
