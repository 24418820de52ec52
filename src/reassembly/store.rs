//! Frame reassembler
//!
//! Turns an in-order packet sequence into complete encoded frames, keeping
//! one [`StreamBuffer`] per stream id.

use std::collections::HashMap;

use bytes::Bytes;

use crate::codec::CodecKind;
use crate::error::{Error, Result, StreamError};
use crate::rtp::RtpPacket;

use super::buffer::StreamBuffer;
use super::frame::{EncodedFrame, StreamId};

/// Reassembler for the streams of one track
///
/// Owned by a single dispatch pipeline, so no locking is needed; the
/// pipeline's read loop is the only caller.
#[derive(Debug)]
pub struct Reassembler {
    /// Codec every stream on this track uses
    codec: CodecKind,

    /// Upper bound on pending bytes per stream
    max_frame_size: usize,

    /// Per-stream buffers
    buffers: HashMap<StreamId, StreamBuffer>,
}

impl Reassembler {
    /// Create a reassembler for a codec
    pub fn new(codec: CodecKind, max_frame_size: usize) -> Self {
        Self {
            codec,
            max_frame_size,
            buffers: HashMap::new(),
        }
    }

    /// Codec of the streams handled here
    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    /// Feed one packet
    ///
    /// Returns `Ok(Some(frame))` when the packet carries the marker bit,
    /// `Ok(None)` while a frame is still being assembled. A malformed payload
    /// returns a media error and leaves the stream's pending bytes untouched.
    /// The size limit covers pending bytes plus any fragment the depacketizer
    /// holds; exceeding it discards both and returns
    /// [`StreamError::BufferOverflow`].
    pub fn push(&mut self, packet: &RtpPacket) -> Result<Option<EncodedFrame>> {
        let stream_id = packet.stream_id();
        let buffer = self.buffers.entry(stream_id).or_insert_with(|| {
            tracing::debug!(stream_id = %stream_id, codec = %self.codec, "New stream buffer");
            StreamBuffer::new(self.codec)
        });

        buffer.track_sequence(packet);

        let fragment = buffer.depacketize(packet)?;
        let additional = fragment.as_ref().map_or(0, Bytes::len);
        if buffer.len_after(additional) > self.max_frame_size {
            buffer.discard();
            return Err(Error::Stream(StreamError::BufferOverflow {
                stream_id,
                limit: self.max_frame_size,
            }));
        }
        if let Some(fragment) = fragment {
            buffer.append(&fragment);
        }
        buffer.count_packet();

        if !packet.marker {
            return Ok(None);
        }

        let (data, packet_count) = buffer.take_frame();
        Ok(Some(EncodedFrame {
            stream_id,
            codec: self.codec,
            timestamp: packet.timestamp,
            packet_count,
            data: data.freeze(),
        }))
    }

    /// Buffer for a stream, if one has been created
    pub fn buffer(&self, stream_id: StreamId) -> Option<&StreamBuffer> {
        self.buffers.get(&stream_id)
    }

    /// Pending bytes for a stream
    pub fn pending_len(&self, stream_id: StreamId) -> usize {
        self.buffers.get(&stream_id).map_or(0, StreamBuffer::pending_len)
    }

    /// Number of streams seen
    pub fn stream_count(&self) -> usize {
        self.buffers.len()
    }

    /// Sequence gaps across all streams
    pub fn sequence_gaps(&self) -> u64 {
        self.buffers.values().map(|b| b.sequence_gaps).sum()
    }
}
