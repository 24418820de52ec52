//! H.264/AVC RTP depacketization (RFC 6184)
//!
//! The first payload byte is a NAL unit header (F | NRI | Type). The type
//! selects the packetization:
//! - 1-23: single NAL unit, the payload is the NAL unit
//! - 24 (STAP-A): several NAL units, each prefixed by a 16-bit size
//! - 28 (FU-A): one fragment of a larger NAL unit
//!
//! FU-A layout:
//! ```text
//! +---------------+---------------+--------- ... ---+
//! | FU indicator  |   FU header   |   FU payload    |
//! |F|NRI|  Type=28|S|E|R|  Type   |                 |
//! +---------------+---------------+--------- ... ---+
//! ```
//!
//! Output is Annex-B: every NAL unit prefixed with `00 00 00 01`.
//! Interleaved mode (STAP-B, MTAP, FU-B) is not supported.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::MediaError;

use super::ANNEXB_START_CODE;

/// Single-time aggregation packet
const STAP_A: u8 = 24;
/// Fragmentation unit, non-interleaved
const FU_A: u8 = 28;

/// NAL unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    /// Non-IDR slice
    Slice = 1,
    /// Slice data partition A
    SlicePartA = 2,
    /// Slice data partition B
    SlicePartB = 3,
    /// Slice data partition C
    SlicePartC = 4,
    /// IDR slice (keyframe)
    Idr = 5,
    /// Supplemental enhancement information
    Sei = 6,
    /// Sequence parameter set
    Sps = 7,
    /// Picture parameter set
    Pps = 8,
    /// Access unit delimiter
    Aud = 9,
    /// End of sequence
    EndSeq = 10,
    /// End of stream
    EndStream = 11,
    /// Filler data
    Filler = 12,
}

impl NaluType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b & 0x1F {
            1 => Some(NaluType::Slice),
            2 => Some(NaluType::SlicePartA),
            3 => Some(NaluType::SlicePartB),
            4 => Some(NaluType::SlicePartC),
            5 => Some(NaluType::Idr),
            6 => Some(NaluType::Sei),
            7 => Some(NaluType::Sps),
            8 => Some(NaluType::Pps),
            9 => Some(NaluType::Aud),
            10 => Some(NaluType::EndSeq),
            11 => Some(NaluType::EndStream),
            12 => Some(NaluType::Filler),
            _ => None,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, NaluType::Idr)
    }
}

/// H.264 depacketizer
///
/// Holds the NAL unit currently being reassembled from FU-A fragments. A
/// fragmented NAL unit is only returned once its end fragment arrives.
#[derive(Debug, Clone, Default)]
pub struct H264Depacketizer {
    fu_buffer: Option<BytesMut>,
}

impl H264Depacketizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fragmented NAL unit has started but not ended
    pub fn has_pending_fragment(&self) -> bool {
        self.fu_buffer.is_some()
    }

    /// Bytes held for a fragmented NAL unit that has not ended
    pub fn held_len(&self) -> usize {
        self.fu_buffer.as_ref().map_or(0, BytesMut::len)
    }

    /// Discard any partially reassembled NAL unit
    pub fn reset(&mut self) {
        self.fu_buffer = None;
    }

    /// Convert one RTP payload into Annex-B bytes
    ///
    /// Returns `Ok(None)` for FU-A fragments that do not complete a NAL unit.
    pub fn unmarshal(&mut self, payload: &Bytes) -> Result<Option<Bytes>, MediaError> {
        let header = *payload.first().ok_or(MediaError::EmptyPayload)?;

        match header & 0x1F {
            1..=23 => {
                let mut out = BytesMut::with_capacity(ANNEXB_START_CODE.len() + payload.len());
                out.put_slice(ANNEXB_START_CODE);
                out.put_slice(payload);
                Ok(Some(out.freeze()))
            }
            STAP_A => Self::unmarshal_stap_a(payload).map(Some),
            FU_A => self.unmarshal_fu_a(payload),
            other => Err(MediaError::UnsupportedNaluType(other)),
        }
    }

    fn unmarshal_stap_a(payload: &[u8]) -> Result<Bytes, MediaError> {
        let mut out = BytesMut::with_capacity(payload.len() + 8);
        let mut offset = 1;

        while offset < payload.len() {
            if offset + 2 > payload.len() {
                return Err(MediaError::InvalidStapA);
            }
            let size = u16::from_be_bytes([payload[offset], payload[offset + 1]]) as usize;
            offset += 2;

            if size == 0 || offset + size > payload.len() {
                return Err(MediaError::InvalidStapA);
            }
            out.put_slice(ANNEXB_START_CODE);
            out.put_slice(&payload[offset..offset + size]);
            offset += size;
        }

        if out.is_empty() {
            return Err(MediaError::InvalidStapA);
        }
        Ok(out.freeze())
    }

    fn unmarshal_fu_a(&mut self, payload: &[u8]) -> Result<Option<Bytes>, MediaError> {
        if payload.len() < 2 {
            return Err(MediaError::ShortPacket);
        }

        let indicator = payload[0];
        let fu_header = payload[1];
        let start = fu_header & 0x80 != 0;
        let end = fu_header & 0x40 != 0;
        let data = &payload[2..];

        if start {
            // Rebuild the original NAL header from F|NRI and the FU type
            let nal_header = (indicator & 0xE0) | (fu_header & 0x1F);
            let mut buf = BytesMut::with_capacity(ANNEXB_START_CODE.len() + 1 + data.len());
            buf.put_slice(ANNEXB_START_CODE);
            buf.put_u8(nal_header);
            buf.put_slice(data);
            self.fu_buffer = Some(buf);
        } else {
            match self.fu_buffer.as_mut() {
                Some(buf) => buf.put_slice(data),
                None => return Err(MediaError::FragmentWithoutStart),
            }
        }

        if end {
            Ok(self.fu_buffer.take().map(BytesMut::freeze))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nalu_type() {
        assert_eq!(NaluType::from_byte(0x65), Some(NaluType::Idr));
        assert_eq!(NaluType::from_byte(0x67), Some(NaluType::Sps));
        assert_eq!(NaluType::from_byte(0x68), Some(NaluType::Pps));
        assert_eq!(NaluType::from_byte(0x41), Some(NaluType::Slice));
        assert_eq!(NaluType::from_byte(0x1C), None);
        assert!(NaluType::Idr.is_keyframe());
    }

    #[test]
    fn test_single_nal() {
        let mut d = H264Depacketizer::new();
        let out = d.unmarshal(&Bytes::from_static(&[0x67, 0x42, 0x00])).unwrap();
        assert_eq!(out.as_deref(), Some(&[0, 0, 0, 1, 0x67, 0x42, 0x00][..]));
    }

    #[test]
    fn test_stap_a() {
        let mut d = H264Depacketizer::new();
        let payload = Bytes::from_static(&[
            0x78, // STAP-A
            0x00, 0x02, 0x67, 0x42, // SPS
            0x00, 0x01, 0x68, // PPS
        ]);
        let out = d.unmarshal(&payload).unwrap().unwrap();
        assert_eq!(&out[..], &[0, 0, 0, 1, 0x67, 0x42, 0, 0, 0, 1, 0x68]);
    }

    #[test]
    fn test_stap_a_overrun() {
        let mut d = H264Depacketizer::new();
        let payload = Bytes::from_static(&[0x78, 0x00, 0x05, 0x67]);
        assert_eq!(d.unmarshal(&payload), Err(MediaError::InvalidStapA));
        assert_eq!(
            d.unmarshal(&Bytes::from_static(&[0x78])),
            Err(MediaError::InvalidStapA)
        );
    }

    #[test]
    fn test_fu_a_three_fragments() {
        let mut d = H264Depacketizer::new();

        assert_eq!(d.unmarshal(&Bytes::from_static(&[0x7C, 0x85, 0x01])).unwrap(), None);
        assert!(d.has_pending_fragment());
        assert_eq!(d.unmarshal(&Bytes::from_static(&[0x7C, 0x05, 0x02])).unwrap(), None);

        let out = d.unmarshal(&Bytes::from_static(&[0x7C, 0x45, 0x03])).unwrap().unwrap();
        assert_eq!(&out[..], &[0, 0, 0, 1, 0x65, 0x01, 0x02, 0x03]);
        assert!(!d.has_pending_fragment());
    }

    #[test]
    fn test_fu_a_without_start_leaves_state_untouched() {
        let mut d = H264Depacketizer::new();
        assert_eq!(
            d.unmarshal(&Bytes::from_static(&[0x7C, 0x45, 0x03])),
            Err(MediaError::FragmentWithoutStart)
        );
        assert!(!d.has_pending_fragment());

        // A bad packet in the middle of a fragmented NAL does not disturb it
        d.unmarshal(&Bytes::from_static(&[0x7C, 0x85, 0x01])).unwrap();
        assert!(d.unmarshal(&Bytes::from_static(&[0x7C])).is_err());
        let out = d.unmarshal(&Bytes::from_static(&[0x7C, 0x45, 0x02])).unwrap().unwrap();
        assert_eq!(&out[..], &[0, 0, 0, 1, 0x65, 0x01, 0x02]);
    }

    #[test]
    fn test_new_start_discards_stale_fragment() {
        let mut d = H264Depacketizer::new();
        d.unmarshal(&Bytes::from_static(&[0x7C, 0x85, 0xAA])).unwrap();
        d.unmarshal(&Bytes::from_static(&[0x5C, 0x81, 0xBB])).unwrap();
        let out = d.unmarshal(&Bytes::from_static(&[0x5C, 0x41, 0xCC])).unwrap().unwrap();
        assert_eq!(&out[..], &[0, 0, 0, 1, 0x41, 0xBB, 0xCC]);
    }

    #[test]
    fn test_unsupported_types() {
        let mut d = H264Depacketizer::new();
        assert_eq!(
            d.unmarshal(&Bytes::from_static(&[0x19, 0x00])),
            Err(MediaError::UnsupportedNaluType(25))
        );
        assert_eq!(
            d.unmarshal(&Bytes::from_static(&[0x1D, 0x00])),
            Err(MediaError::UnsupportedNaluType(29))
        );
        assert_eq!(
            d.unmarshal(&Bytes::from_static(&[0x00])),
            Err(MediaError::UnsupportedNaluType(0))
        );
        assert_eq!(d.unmarshal(&Bytes::new()), Err(MediaError::EmptyPayload));
    }
}
