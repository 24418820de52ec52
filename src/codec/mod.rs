//! Codec depacketization
//!
//! Each supported video codec has a depacketizer that turns one RTP payload
//! into zero or more bytes of the encoded bitstream:
//! - VP8 (RFC 7741) and VP9 (draft-ietf-payload-vp9): strip the payload descriptor
//! - H.264 (RFC 6184): Annex-B NAL units, FU-A fragments held until complete
//! - H.265 (RFC 7798): Annex-B NAL units, fragments emitted as they arrive
//!
//! Accumulating fragments into whole frames is the reassembler's job; a
//! depacketizer only ever looks at one payload at a time (plus, for H.264,
//! the NAL unit currently being fragmented).

pub mod h264;
pub mod h265;
pub mod registry;
pub mod vp8;
pub mod vp9;

use bytes::Bytes;

use crate::error::MediaError;

pub use h264::H264Depacketizer;
pub use h265::H265Depacketizer;
pub use registry::CodecKind;
pub use vp8::Vp8Depacketizer;
pub use vp9::Vp9Depacketizer;

/// Annex-B start code prepended to every NAL unit
pub(crate) const ANNEXB_START_CODE: &[u8] = &[0x00, 0x00, 0x00, 0x01];

/// Depacketizer selected once per stream from its codec
#[derive(Debug, Clone)]
pub enum Depacketizer {
    /// VP8 payload descriptor stripping
    Vp8(Vp8Depacketizer),
    /// VP9 payload descriptor stripping
    Vp9(Vp9Depacketizer),
    /// H.264 NAL unit extraction with FU-A state
    H264(H264Depacketizer),
    /// H.265 NAL unit extraction
    H265(H265Depacketizer),
}

impl Depacketizer {
    /// Create the depacketizer for a codec
    pub fn for_codec(codec: CodecKind) -> Self {
        match codec {
            CodecKind::Vp8 => Depacketizer::Vp8(Vp8Depacketizer),
            CodecKind::Vp9 => Depacketizer::Vp9(Vp9Depacketizer),
            CodecKind::H264 => Depacketizer::H264(H264Depacketizer::new()),
            CodecKind::H265 => Depacketizer::H265(H265Depacketizer),
        }
    }

    /// Codec this depacketizer handles
    pub fn codec(&self) -> CodecKind {
        match self {
            Depacketizer::Vp8(_) => CodecKind::Vp8,
            Depacketizer::Vp9(_) => CodecKind::Vp9,
            Depacketizer::H264(_) => CodecKind::H264,
            Depacketizer::H265(_) => CodecKind::H265,
        }
    }

    /// Extract bitstream bytes from one RTP payload
    ///
    /// Returns `Ok(None)` when the packet is valid but produced nothing yet
    /// (an H.264 FU-A fragment before its end). On error the depacketizer's
    /// state is left as it was before the call.
    pub fn unmarshal(&mut self, payload: &Bytes) -> Result<Option<Bytes>, MediaError> {
        match self {
            Depacketizer::Vp8(d) => d.unmarshal(payload).map(Some),
            Depacketizer::Vp9(d) => d.unmarshal(payload).map(Some),
            Depacketizer::H264(d) => d.unmarshal(payload),
            Depacketizer::H265(d) => d.unmarshal(payload).map(Some),
        }
    }

    /// Bytes held back for a NAL unit whose fragments have not all arrived
    pub fn held_len(&self) -> usize {
        match self {
            Depacketizer::H264(d) => d.held_len(),
            _ => 0,
        }
    }

    /// Drop any continuation state carried between packets
    ///
    /// Called at frame boundaries: a NAL unit never spans two frames.
    pub fn reset(&mut self) {
        if let Depacketizer::H264(d) = self {
            d.reset();
        }
    }
}

/// Whether an assembled frame starts a new decodable sequence
///
/// H.264 frames are checked for an IDR slice, H.265 frames for an IRAP
/// picture, VP8/VP9 frames by the frame type bit of their frame header.
pub fn is_keyframe(codec: CodecKind, frame: &[u8]) -> bool {
    match codec {
        CodecKind::H264 => AnnexBNalus::new(frame)
            .filter_map(|nal| nal.first().copied())
            .any(|b| h264::NaluType::from_byte(b).is_some_and(|t| t.is_keyframe())),
        CodecKind::H265 => AnnexBNalus::new(frame)
            .filter_map(|nal| nal.first().copied())
            .any(|b| h265::is_irap((b >> 1) & 0x3F)),
        CodecKind::Vp8 => frame.first().is_some_and(|b| b & 0x01 == 0),
        CodecKind::Vp9 => frame.first().is_some_and(|&b| vp9_is_keyframe(b)),
    }
}

/// VP9 uncompressed header: frame_marker(2) profile(2) [reserved(1)]
/// show_existing_frame(1) frame_type(1)
fn vp9_is_keyframe(b: u8) -> bool {
    if b >> 6 != 0b10 {
        return false;
    }
    let profile = ((b >> 5) & 1) | (((b >> 4) & 1) << 1);
    let shift = if profile == 3 { 1 } else { 0 };
    let show_existing = (b >> (3 - shift)) & 1;
    let frame_type = (b >> (2 - shift)) & 1;
    show_existing == 0 && frame_type == 0
}

/// Iterator over NAL units in an Annex-B byte stream
///
/// Accepts both 3-byte and 4-byte start codes.
pub struct AnnexBNalus<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> AnnexBNalus<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let offset = Self::find_start(data, 0).unwrap_or(data.len());
        Self { data, offset }
    }

    /// Position just past the next start code at or after `from`
    fn find_start(data: &[u8], from: usize) -> Option<usize> {
        let mut i = from;
        while i + 3 <= data.len() {
            if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
                return Some(i + 3);
            }
            i += 1;
        }
        None
    }
}

impl<'a> Iterator for AnnexBNalus<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let start = self.offset;
        let (end, next) = match Self::find_start(self.data, start) {
            Some(next) => {
                // Trailing zero of a 4-byte start code belongs to the next one
                let mut end = next - 3;
                if end > start && self.data[end - 1] == 0 {
                    end -= 1;
                }
                (end, next)
            }
            None => (self.data.len(), self.data.len()),
        };

        self.offset = next;
        Some(&self.data[start..end])
    }
}
