//! Per-stream reassembly buffer
//!
//! This module defines the state the reassembler keeps for each stream.

use std::time::Instant;

use bytes::BytesMut;

use crate::codec::{CodecKind, Depacketizer};
use crate::error::MediaError;
use crate::rtp::RtpPacket;

/// Accumulator for the frame currently being assembled on one stream
#[derive(Debug)]
pub struct StreamBuffer {
    /// Codec bound at creation; never changes
    codec: CodecKind,

    /// Depacketizer, including its continuation state
    depacketizer: Depacketizer,

    /// Bitstream bytes received since the last frame boundary
    pending: BytesMut,

    /// Packets folded into the pending bytes
    pending_packets: u32,

    /// Sequence number of the last packet seen
    last_sequence: Option<u16>,

    /// Packets whose sequence number did not follow the previous one
    pub sequence_gaps: u64,

    /// Frames emitted from this buffer
    pub frames_emitted: u64,

    /// When the first packet for this stream arrived
    pub created_at: Instant,
}

impl StreamBuffer {
    /// Create an empty buffer bound to a codec
    pub(super) fn new(codec: CodecKind) -> Self {
        Self {
            codec,
            depacketizer: Depacketizer::for_codec(codec),
            pending: BytesMut::new(),
            pending_packets: 0,
            last_sequence: None,
            sequence_gaps: 0,
            frames_emitted: 0,
            created_at: Instant::now(),
        }
    }

    /// Codec this buffer was bound to
    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    /// Bytes waiting for a frame boundary
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is waiting for a frame boundary
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record the packet's sequence number, counting gaps
    ///
    /// Out-of-order packets are not reordered; they only show up here.
    pub(super) fn track_sequence(&mut self, packet: &RtpPacket) {
        if let Some(last) = self.last_sequence {
            if packet.sequence_number != last.wrapping_add(1) {
                self.sequence_gaps += 1;
                tracing::debug!(
                    stream_id = %packet.stream_id(),
                    expected = last.wrapping_add(1),
                    actual = packet.sequence_number,
                    "Sequence gap"
                );
            }
        }
        self.last_sequence = Some(packet.sequence_number);
    }

    /// Run the depacketizer over one payload without touching pending bytes
    pub(super) fn depacketize(&mut self, packet: &RtpPacket) -> Result<Option<bytes::Bytes>, MediaError> {
        self.depacketizer.unmarshal(&packet.payload)
    }

    /// Bytes this stream would hold after appending `additional`
    ///
    /// Counts the depacketizer's held fragment as well as pending bytes.
    pub(super) fn len_after(&self, additional: usize) -> usize {
        self.pending.len() + self.depacketizer.held_len() + additional
    }

    /// Append fragment bytes
    pub(super) fn append(&mut self, fragment: &[u8]) {
        self.pending.extend_from_slice(fragment);
    }

    /// Count a packet toward the pending frame
    pub(super) fn count_packet(&mut self) {
        self.pending_packets += 1;
    }

    /// Take the pending bytes as a frame and reset for the next one
    ///
    /// The codec binding survives. An unfinished fragmented NAL unit does not.
    pub(super) fn take_frame(&mut self) -> (BytesMut, u32) {
        self.depacketizer.reset();
        let packets = std::mem::take(&mut self.pending_packets);
        self.frames_emitted += 1;
        (self.pending.split(), packets)
    }

    /// Drop pending bytes without emitting a frame
    pub(super) fn discard(&mut self) {
        self.depacketizer.reset();
        self.pending.clear();
        self.pending_packets = 0;
    }
}
