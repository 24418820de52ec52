//! Inbound track abstraction

use std::future::Future;

use crate::error::Result;
use crate::rtp::RtpPacket;

/// Media kind of an inbound track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote track delivering RTP packets in arrival order
///
/// Implemented by the peer engine's track type, and by [`crate::rtp::UdpTrack`]
/// for plain RTP over UDP.
pub trait TrackSource: Send + 'static {
    /// Track identifier, used in logs and reports
    fn id(&self) -> &str;

    /// Audio or video
    fn kind(&self) -> TrackKind;

    /// Negotiated MIME type, e.g. `video/H264`
    fn mime_type(&self) -> &str;

    /// Read the next packet
    ///
    /// Returns `Ok(None)` at end of stream. A [`crate::error::Error::Media`]
    /// error drops one packet; any other error ends the stream.
    fn read_rtp(&mut self) -> impl Future<Output = Result<Option<RtpPacket>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_kind_display() {
        assert_eq!(TrackKind::Audio.to_string(), "audio");
        assert_eq!(TrackKind::Video.as_str(), "video");
    }
}
