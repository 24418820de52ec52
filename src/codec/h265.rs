//! H.265/HEVC RTP depacketization (RFC 7798)
//!
//! NAL unit header (two bytes):
//! ```text
//! +---------------+---------------+
//! |F|   Type    |  LayerId  | TID |
//! +---------------+---------------+
//! ```
//!
//! Packet types handled:
//! - 0-47: single NAL unit
//! - 48 (AP): aggregation packet, NAL units prefixed by a 16-bit size
//! - 49 (FU): fragmentation unit with a one-byte FU header `|S|E| FuType |`
//!
//! Fragments are emitted as they arrive: the start fragment carries the start
//! code and the rebuilt NAL header, later fragments carry raw data. Since the
//! reassembler appends in order, no state is needed here. DONL fields
//! (sprop-max-don-diff > 0) and PACI packets are not supported.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::MediaError;

use super::ANNEXB_START_CODE;

/// Aggregation packet
const AP: u8 = 48;
/// Fragmentation unit
const FU: u8 = 49;

/// NAL unit header size
const NAL_HEADER_SIZE: usize = 2;

/// NAL unit type of the first header byte
fn nal_type(b0: u8) -> u8 {
    (b0 >> 1) & 0x3F
}

/// Whether the NAL unit type is an IRAP picture (BLA, IDR or CRA)
pub fn is_irap(nal_type: u8) -> bool {
    (16..=23).contains(&nal_type)
}

/// Stateless H.265 depacketizer
#[derive(Debug, Clone, Copy, Default)]
pub struct H265Depacketizer;

impl H265Depacketizer {
    /// Convert one RTP payload into Annex-B bytes
    pub fn unmarshal(&self, payload: &Bytes) -> Result<Bytes, MediaError> {
        if payload.is_empty() {
            return Err(MediaError::EmptyPayload);
        }
        if payload.len() < NAL_HEADER_SIZE {
            return Err(MediaError::ShortPacket);
        }
        if payload[0] & 0x80 != 0 {
            return Err(MediaError::ForbiddenBitSet);
        }

        match nal_type(payload[0]) {
            0..=47 => {
                let mut out = BytesMut::with_capacity(ANNEXB_START_CODE.len() + payload.len());
                out.put_slice(ANNEXB_START_CODE);
                out.put_slice(payload);
                Ok(out.freeze())
            }
            AP => Self::unmarshal_aggregation(payload),
            FU => Self::unmarshal_fragment(payload),
            other => Err(MediaError::UnsupportedH265Type(other)),
        }
    }

    fn unmarshal_aggregation(payload: &Bytes) -> Result<Bytes, MediaError> {
        let mut out = BytesMut::with_capacity(payload.len() + 8);
        let mut offset = NAL_HEADER_SIZE;

        while offset < payload.len() {
            if offset + 2 > payload.len() {
                return Err(MediaError::InvalidAggregation);
            }
            let size = u16::from_be_bytes([payload[offset], payload[offset + 1]]) as usize;
            offset += 2;

            if size < NAL_HEADER_SIZE || offset + size > payload.len() {
                return Err(MediaError::InvalidAggregation);
            }
            out.put_slice(ANNEXB_START_CODE);
            out.put_slice(&payload[offset..offset + size]);
            offset += size;
        }

        if out.is_empty() {
            return Err(MediaError::InvalidAggregation);
        }
        Ok(out.freeze())
    }

    fn unmarshal_fragment(payload: &Bytes) -> Result<Bytes, MediaError> {
        if payload.len() < NAL_HEADER_SIZE + 1 {
            return Err(MediaError::ShortPacket);
        }

        let fu_header = payload[2];
        let start = fu_header & 0x80 != 0;
        let fu_type = fu_header & 0x3F;
        let data = payload.slice(NAL_HEADER_SIZE + 1..);

        if !start {
            return Ok(data);
        }

        // Original header: keep F and the LayerId high bit, swap in the FU type
        let b0 = (payload[0] & 0x81) | (fu_type << 1);
        let b1 = payload[1];

        let mut out = BytesMut::with_capacity(ANNEXB_START_CODE.len() + 2 + data.len());
        out.put_slice(ANNEXB_START_CODE);
        out.put_u8(b0);
        out.put_u8(b1);
        out.put_slice(&data);
        Ok(out.freeze())
    }
}
