//! Codec lookup table
//!
//! Maps negotiated MIME types to codec kinds. The table is a plain static
//! slice; it is never mutated after compilation.

use std::fmt;

/// Supported video codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    /// VP8
    Vp8,
    /// VP9
    Vp9,
    /// H.264/AVC
    H264,
    /// H.265/HEVC
    H265,
}

/// MIME subtype to codec mapping
static CODEC_TABLE: &[(&str, CodecKind)] = &[
    ("VP8", CodecKind::Vp8),
    ("VP9", CodecKind::Vp9),
    ("H264", CodecKind::H264),
    ("H265", CodecKind::H265),
];

impl CodecKind {
    /// Look up a codec by MIME type (`video/VP8`) or bare subtype (`VP8`)
    ///
    /// Matching is case-insensitive. Returns `None` for codecs without a
    /// depacketizer (audio codecs, AV1, ...).
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let subtype = match mime.split_once('/') {
            Some((_, subtype)) => subtype,
            None => mime,
        };

        CODEC_TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(subtype))
            .map(|(_, kind)| *kind)
    }

    /// Canonical MIME subtype
    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Vp8 => "VP8",
            CodecKind::Vp9 => "VP9",
            CodecKind::H264 => "H264",
            CodecKind::H265 => "H265",
        }
    }

    /// Full MIME type as negotiated in SDP
    pub fn mime_type(&self) -> String {
        format!("video/{}", self.name())
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
