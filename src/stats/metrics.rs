//! Statistics for relay sessions and streams

use std::time::{Duration, Instant};

use crate::codec::CodecKind;

/// Stream-level statistics, kept by the dispatch pipeline
#[derive(Debug, Clone)]
pub struct StreamStats {
    /// Track identifier
    pub track_id: String,
    /// Codec of the track
    pub codec: CodecKind,
    /// Start time
    pub started_at: Instant,
    /// Packets read from the track
    pub packets_received: u64,
    /// Payload bytes read from the track
    pub bytes_received: u64,
    /// Packets dropped as malformed
    pub malformed_packets: u64,
    /// Packets whose sequence number did not follow the previous one
    pub sequence_gaps: u64,
    /// Complete frames assembled
    pub frames_assembled: u64,
    /// Frame boundaries with nothing to decode
    pub empty_frames: u64,
    /// Keyframes assembled
    pub keyframes: u64,
    /// Frames the decoder rejected
    pub decode_failures: u64,
    /// Inference calls completed
    pub inferences: u64,
    /// Results sent to the client
    pub results_sent: u64,
    /// Results held back by the debouncer
    pub results_suppressed: u64,
    /// Placeholder results dropped by the ignore list
    pub results_ignored: u64,
    /// Last decoded frame width
    pub width: Option<u32>,
    /// Last decoded frame height
    pub height: Option<u32>,
}

impl StreamStats {
    pub fn new(track_id: impl Into<String>, codec: CodecKind) -> Self {
        Self {
            track_id: track_id.into(),
            codec,
            started_at: Instant::now(),
            packets_received: 0,
            bytes_received: 0,
            malformed_packets: 0,
            sequence_gaps: 0,
            frames_assembled: 0,
            empty_frames: 0,
            keyframes: 0,
            decode_failures: 0,
            inferences: 0,
            results_sent: 0,
            results_suppressed: 0,
            results_ignored: 0,
            width: None,
            height: None,
        }
    }

    /// Get duration since stream started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Calculate bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_received * 8) / secs
        } else {
            0
        }
    }

    /// Calculate assembled frame rate
    pub fn calculated_framerate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames_assembled as f64 / secs
        } else {
            0.0
        }
    }
}

/// Session-level statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Inbound signaling messages handled
    pub messages_received: u64,
    /// Inbound signaling messages ignored as invalid
    pub messages_rejected: u64,
    /// Outbound ICE candidates sent
    pub candidates_sent: u64,
    /// Video tracks with a running pipeline
    pub streams_started: u64,
    /// Pipelines that have finished
    pub streams_ended: u64,
    /// Tracks ignored (audio or unsupported codec)
    pub tracks_ignored: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipelines still running
    pub fn active_streams(&self) -> u64 {
        self.streams_started.saturating_sub(self.streams_ended)
    }
}
