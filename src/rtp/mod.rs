//! RTP transport types
//!
//! This module provides:
//! - RTP header parsing
//! - A UDP-backed track source for plain (unencrypted) RTP feeds

pub mod packet;
pub mod udp;

pub use packet::{RtpPacket, RTP_HEADER_SIZE};
pub use udp::UdpTrack;
