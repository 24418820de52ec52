//! Frame reassembly
//!
//! The reassembler turns RTP packets into complete encoded frames. Each
//! stream id gets its own buffer bound to the track's codec; the codec's
//! depacketizer yields bitstream bytes for each packet, which are appended
//! until a packet with the marker bit closes the frame.
//!
//! # Flow
//!
//! ```text
//!   RtpPacket ──► Reassembler::push()
//!                     │
//!                     ├─ buffers[ssrc] (created on first packet)
//!                     │     │
//!                     │     ├─ Depacketizer::unmarshal(payload) ──► fragment?
//!                     │     └─ pending.extend(fragment)
//!                     │
//!                     └─ marker? ──► EncodedFrame (pending taken, buffer kept)
//! ```
//!
//! Packets are assumed to arrive in order. Sequence gaps are counted but
//! never repaired.

pub mod buffer;
pub mod frame;
pub mod store;

pub use buffer::StreamBuffer;
pub use frame::{EncodedFrame, StreamId};
pub use store::Reassembler;
