//! RTP packet parsing
//!
//! Fixed header layout (RFC 3550):
//! ```text
//!  0                   1                   2                   3
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! |                           timestamp                           |
//! |           synchronization source (SSRC) identifier            |
//! |            contributing source (CSRC) identifiers             |
//! |                             ....                              |
//! ```
//!
//! If X is set, a header extension follows the CSRC list: a 16-bit profile
//! identifier, a 16-bit length in 32-bit words, then the extension body.
//! If P is set, the last payload byte holds the number of padding bytes.

use bytes::{Buf, Bytes};

use crate::error::MediaError;
use crate::reassembly::StreamId;

/// Fixed header size in bytes
pub const RTP_HEADER_SIZE: usize = 12;

/// Only RTP version 2 is in use
pub const RTP_VERSION: u8 = 2;

/// One RTP packet as received from the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// Payload type
    pub payload_type: u8,
    /// Sequence number (wraps at 65535)
    pub sequence_number: u16,
    /// Media timestamp
    pub timestamp: u32,
    /// Synchronization source
    pub ssrc: u32,
    /// Last packet of the current frame
    pub marker: bool,
    /// Codec payload with header, extension and padding removed
    pub payload: Bytes,
}

impl RtpPacket {
    /// Build a packet from already-parsed fields
    pub fn new(ssrc: u32, sequence_number: u16, marker: bool, payload: Bytes) -> Self {
        Self {
            payload_type: 0,
            sequence_number,
            timestamp: 0,
            ssrc,
            marker,
            payload,
        }
    }

    /// Set the media timestamp
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Stream this packet belongs to
    pub fn stream_id(&self) -> StreamId {
        StreamId(self.ssrc)
    }

    /// Parse a raw RTP datagram
    pub fn parse(mut data: Bytes) -> Result<Self, MediaError> {
        if data.len() < RTP_HEADER_SIZE {
            return Err(MediaError::ShortPacket);
        }

        let b0 = data.get_u8();
        let version = b0 >> 6;
        if version != RTP_VERSION {
            return Err(MediaError::UnsupportedRtpVersion(version));
        }
        let has_padding = b0 & 0x20 != 0;
        let has_extension = b0 & 0x10 != 0;
        let csrc_count = (b0 & 0x0F) as usize;

        let b1 = data.get_u8();
        let marker = b1 & 0x80 != 0;
        let payload_type = b1 & 0x7F;
        let sequence_number = data.get_u16();
        let timestamp = data.get_u32();
        let ssrc = data.get_u32();

        // CSRC list is not needed downstream
        if data.len() < csrc_count * 4 {
            return Err(MediaError::ShortPacket);
        }
        data.advance(csrc_count * 4);

        if has_extension {
            if data.len() < 4 {
                return Err(MediaError::ShortPacket);
            }
            let _profile = data.get_u16();
            let ext_len = data.get_u16() as usize * 4;
            if data.len() < ext_len {
                return Err(MediaError::ShortPacket);
            }
            data.advance(ext_len);
        }

        if has_padding {
            let pad = *data.last().ok_or(MediaError::InvalidPadding)? as usize;
            if pad == 0 || pad > data.len() {
                return Err(MediaError::InvalidPadding);
            }
            data.truncate(data.len() - pad);
        }

        Ok(RtpPacket {
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            marker,
            payload: data,
        })
    }
}
