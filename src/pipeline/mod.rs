//! Frame dispatch
//!
//! A pipeline owns one inbound video track and carries its media all the way
//! to the client:
//!
//! ```text
//!   TrackSource::read_rtp()
//!        │
//!        ▼
//!   Reassembler::push() ── malformed? drop packet
//!        │ EncodedFrame
//!        ▼
//!   FrameDecoder::decode() ── failed? drop frame
//!        │ DecodedFrame
//!        ▼
//!   InferenceClient::infer() ── timeout / error? end stream
//!        │ text
//!        ▼
//!   ignore list ─► ResultDebouncer::accept() ─► SignalWriter (`text` message)
//! ```
//!
//! The collaborators (track, decoder, inference client) are traits so the
//! relay can sit in front of any peer-connection stack and inference backend.

pub mod config;
pub mod dispatch;
pub mod service;
pub mod track;

pub use config::{PipelineConfig, NO_RESULT_TEXT};
pub use dispatch::{FramePipeline, StreamEnd, StreamReport};
pub use service::{DecodedFrame, FrameDecoder, InferenceClient};
pub use track::{TrackKind, TrackSource};
