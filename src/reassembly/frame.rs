//! Stream identifiers and assembled frames

use bytes::Bytes;

use crate::codec::{self, CodecKind};

/// Identifier of one media stream (the RTP SSRC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for StreamId {
    fn from(ssrc: u32) -> Self {
        StreamId(ssrc)
    }
}

/// A complete encoded frame ready for the decoder
///
/// Cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Stream the frame was assembled from
    pub stream_id: StreamId,
    /// Codec of the bitstream
    pub codec: CodecKind,
    /// RTP timestamp of the packet that completed the frame
    pub timestamp: u32,
    /// Number of packets folded into the frame
    pub packet_count: u32,
    /// Encoded bitstream
    pub data: Bytes,
}

impl EncodedFrame {
    /// Frame size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// A frame boundary with nothing accumulated before it
    ///
    /// Empty frames are not decoder input.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the frame is independently decodable
    pub fn is_keyframe(&self) -> bool {
        codec::is_keyframe(self.codec, &self.data)
    }
}
