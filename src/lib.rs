//! RTP frame relay
//!
//! Receives video over RTP, reassembles complete encoded frames, runs them
//! through a decoder and a remote inference service, and relays the results
//! back to the client over its signaling channel.
//!
//! # Example
//!
//! ```ignore
//! use rtp_relay::server::{RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> rtp_relay::error::Result<()> {
//!     let server = RelayServer::new(ServerConfig::from_env(), MyBackend::new());
//!     server.run().await
//! }
//! ```

pub mod codec;
pub mod debounce;
pub mod error;
pub mod pipeline;
pub mod reassembly;
pub mod rtp;
pub mod server;
pub mod session;
pub mod signaling;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::CodecKind;
pub use debounce::ResultDebouncer;
pub use error::{Error, Result};
pub use pipeline::{FramePipeline, PipelineConfig, StreamReport};
pub use reassembly::{EncodedFrame, Reassembler, StreamId};
pub use rtp::RtpPacket;
pub use server::{RelayServer, ServerConfig};
pub use session::{Backend, PeerEngine, Session};
