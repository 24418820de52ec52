//! VP8 RTP depacketization (RFC 7741)
//!
//! Payload descriptor:
//! ```text
//!       0 1 2 3 4 5 6 7
//!      +-+-+-+-+-+-+-+-+
//!      |X|R|N|S|R| PID | (REQUIRED)
//!      +-+-+-+-+-+-+-+-+
//! X:   |I|L|T|K| RSV   | (OPTIONAL)
//!      +-+-+-+-+-+-+-+-+
//! I:   |M| PictureID   | (OPTIONAL, 7 or 15 bits)
//!      +-+-+-+-+-+-+-+-+
//! L:   |   TL0PICIDX   | (OPTIONAL)
//!      +-+-+-+-+-+-+-+-+
//! T/K: |TID|Y| KEYIDX  | (OPTIONAL)
//!      +-+-+-+-+-+-+-+-+
//! ```
//!
//! Everything after the descriptor is VP8 bitstream.

use bytes::Bytes;

use crate::error::MediaError;

/// Parsed VP8 payload descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vp8Descriptor {
    /// Non-reference frame
    pub non_reference: bool,
    /// First packet of a VP8 partition
    pub start_of_partition: bool,
    /// Partition index
    pub partition_id: u8,
    /// Picture ID, if present
    pub picture_id: Option<u16>,
    /// Temporal level zero index, if present
    pub tl0_pic_idx: Option<u8>,
    /// Length of the descriptor in bytes
    pub header_len: usize,
}

impl Vp8Descriptor {
    /// Parse the descriptor at the start of a payload
    pub fn parse(payload: &[u8]) -> Result<Self, MediaError> {
        let b0 = *payload.first().ok_or(MediaError::EmptyPayload)?;

        let mut desc = Vp8Descriptor {
            non_reference: b0 & 0x20 != 0,
            start_of_partition: b0 & 0x10 != 0,
            partition_id: b0 & 0x07,
            ..Default::default()
        };
        let mut idx = 1;

        if b0 & 0x80 != 0 {
            let ext = *payload.get(idx).ok_or(MediaError::InvalidVp8Descriptor)?;
            idx += 1;

            if ext & 0x80 != 0 {
                let pid = *payload.get(idx).ok_or(MediaError::InvalidVp8Descriptor)?;
                idx += 1;
                if pid & 0x80 != 0 {
                    let low = *payload.get(idx).ok_or(MediaError::InvalidVp8Descriptor)?;
                    idx += 1;
                    desc.picture_id = Some((((pid & 0x7F) as u16) << 8) | low as u16);
                } else {
                    desc.picture_id = Some(pid as u16);
                }
            }
            if ext & 0x40 != 0 {
                desc.tl0_pic_idx = Some(*payload.get(idx).ok_or(MediaError::InvalidVp8Descriptor)?);
                idx += 1;
            }
            // TID/Y/KEYIDX share one byte
            if ext & 0x30 != 0 {
                idx += 1;
            }
        }

        if idx >= payload.len() {
            return Err(MediaError::InvalidVp8Descriptor);
        }

        desc.header_len = idx;
        Ok(desc)
    }

    /// Whether this packet starts a frame (S=1, PID=0)
    pub fn is_frame_start(&self) -> bool {
        self.start_of_partition && self.partition_id == 0
    }
}

/// Stateless VP8 depacketizer
#[derive(Debug, Clone, Copy, Default)]
pub struct Vp8Depacketizer;

impl Vp8Depacketizer {
    /// Strip the payload descriptor and return the VP8 bitstream bytes
    pub fn unmarshal(&self, payload: &Bytes) -> Result<Bytes, MediaError> {
        let desc = Vp8Descriptor::parse(payload)?;
        Ok(payload.slice(desc.header_len..))
    }

}
