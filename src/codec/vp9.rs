//! VP9 RTP depacketization (draft-ietf-payload-vp9)
//!
//! Payload descriptor:
//! ```text
//!         0 1 2 3 4 5 6 7
//!        +-+-+-+-+-+-+-+-+
//!        |I|P|L|F|B|E|V|Z| (REQUIRED)
//!        +-+-+-+-+-+-+-+-+
//!   I:   |M| PICTURE ID  | (7 or 15 bits)
//!        +-+-+-+-+-+-+-+-+
//!   L:   |  T  |U|  S  |D| (layer indices)
//!        +-+-+-+-+-+-+-+-+
//!        |   TL0PICIDX   | (non-flexible mode only)
//!        +-+-+-+-+-+-+-+-+
//!  F&P:  | P_DIFF      |N| (up to 3 times)
//!        +-+-+-+-+-+-+-+-+
//!   V:   | SS            | (scalability structure)
//!        +-+-+-+-+-+-+-+-+
//! ```

use bytes::Bytes;

use crate::error::MediaError;

/// Maximum number of reference picture diffs in flexible mode
const MAX_P_DIFFS: usize = 3;

/// Parsed VP9 payload descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vp9Descriptor {
    /// Inter-picture predicted frame
    pub inter_predicted: bool,
    /// Flexible mode
    pub flexible: bool,
    /// Start of a frame
    pub start_of_frame: bool,
    /// End of a frame
    pub end_of_frame: bool,
    /// Picture ID, if present
    pub picture_id: Option<u16>,
    /// Spatial layer id, if layer indices are present
    pub spatial_id: Option<u8>,
    /// Length of the descriptor in bytes
    pub header_len: usize,
}

/// Cursor over descriptor bytes that reports truncation as a descriptor error
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn next(&mut self) -> Result<u8, MediaError> {
        let b = *self.data.get(self.pos).ok_or(MediaError::InvalidVp9Descriptor)?;
        self.pos += 1;
        Ok(b)
    }

    fn skip(&mut self, n: usize) -> Result<(), MediaError> {
        if self.pos + n > self.data.len() {
            return Err(MediaError::InvalidVp9Descriptor);
        }
        self.pos += n;
        Ok(())
    }
}

impl Vp9Descriptor {
    /// Parse the descriptor at the start of a payload
    pub fn parse(payload: &[u8]) -> Result<Self, MediaError> {
        if payload.is_empty() {
            return Err(MediaError::EmptyPayload);
        }
        let mut r = Reader { data: payload, pos: 0 };

        let b0 = r.next()?;
        let has_picture_id = b0 & 0x80 != 0;
        let has_layers = b0 & 0x20 != 0;
        let has_ss = b0 & 0x02 != 0;

        let mut desc = Vp9Descriptor {
            inter_predicted: b0 & 0x40 != 0,
            flexible: b0 & 0x10 != 0,
            start_of_frame: b0 & 0x08 != 0,
            end_of_frame: b0 & 0x04 != 0,
            ..Default::default()
        };

        if has_picture_id {
            let b = r.next()?;
            if b & 0x80 != 0 {
                let low = r.next()?;
                desc.picture_id = Some((((b & 0x7F) as u16) << 8) | low as u16);
            } else {
                desc.picture_id = Some(b as u16);
            }
        }

        if has_layers {
            let b = r.next()?;
            desc.spatial_id = Some((b >> 1) & 0x07);
            if !desc.flexible {
                // TL0PICIDX
                r.skip(1)?;
            }
        }

        if desc.flexible && desc.inter_predicted {
            let mut count = 0;
            loop {
                let b = r.next()?;
                count += 1;
                if b & 0x01 == 0 {
                    break;
                }
                if count == MAX_P_DIFFS {
                    return Err(MediaError::InvalidVp9Descriptor);
                }
            }
        }

        if has_ss {
            Self::skip_scalability_structure(&mut r)?;
        }

        if r.pos >= payload.len() {
            return Err(MediaError::InvalidVp9Descriptor);
        }

        desc.header_len = r.pos;
        Ok(desc)
    }

    fn skip_scalability_structure(r: &mut Reader<'_>) -> Result<(), MediaError> {
        let b = r.next()?;
        let spatial_layers = ((b >> 5) as usize) + 1;
        let has_resolution = b & 0x10 != 0;
        let has_groups = b & 0x08 != 0;

        if has_resolution {
            // WIDTH (2) + HEIGHT (2) per spatial layer
            r.skip(spatial_layers * 4)?;
        }

        if has_groups {
            let groups = r.next()?;
            for _ in 0..groups {
                let g = r.next()?;
                let refs = ((g >> 2) & 0x03) as usize;
                r.skip(refs)?;
            }
        }

        Ok(())
    }
}

/// Stateless VP9 depacketizer
#[derive(Debug, Clone, Copy, Default)]
pub struct Vp9Depacketizer;

impl Vp9Depacketizer {
    /// Strip the payload descriptor and return the VP9 bitstream bytes
    pub fn unmarshal(&self, payload: &Bytes) -> Result<Bytes, MediaError> {
        let desc = Vp9Descriptor::parse(payload)?;
        Ok(payload.slice(desc.header_len..))
    }
}
