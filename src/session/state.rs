//! Session state machine
//!
//! Tracks a relay session from the WebSocket upgrade to teardown.

use std::time::Instant;

use crate::stats::SessionStats;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Signaling connected, no offer handled yet
    AwaitingOffer,
    /// An offer was answered; tracks may arrive
    Negotiated,
    /// Tearing down pipelines and the engine
    Closing,
    /// Session closed
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Time the first offer was answered
    pub negotiated_at: Option<Instant>,

    /// Offers answered after the first one
    pub renegotiations: u32,

    /// Session counters
    pub stats: SessionStats,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64) -> Self {
        Self {
            id,
            phase: SessionPhase::AwaitingOffer,
            connected_at: Instant::now(),
            negotiated_at: None,
            renegotiations: 0,
            stats: SessionStats::new(),
        }
    }

    /// An answer was sent for an offer
    pub fn on_negotiated(&mut self) {
        match self.phase {
            SessionPhase::AwaitingOffer => {
                self.phase = SessionPhase::Negotiated;
                self.negotiated_at = Some(Instant::now());
            }
            SessionPhase::Negotiated => self.renegotiations += 1,
            SessionPhase::Closing | SessionPhase::Closed => {}
        }
    }

    /// A pipeline was spawned for a video track
    pub fn on_stream_started(&mut self) {
        self.stats.streams_started += 1;
    }

    /// A pipeline finished
    pub fn on_stream_ended(&mut self) {
        self.stats.streams_ended += 1;
    }

    /// A track was accepted but not processed
    pub fn on_track_ignored(&mut self) {
        self.stats.tracks_ignored += 1;
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Time from connection to the first answer
    pub fn time_to_answer(&self) -> Option<std::time::Duration> {
        self.negotiated_at.map(|t| t.duration_since(self.connected_at))
    }

    /// Check if an offer has been answered
    pub fn is_negotiated(&self) -> bool {
        self.phase == SessionPhase::Negotiated
    }

    /// Start closing the session
    pub fn close(&mut self) {
        if self.phase != SessionPhase::Closed {
            self.phase = SessionPhase::Closing;
        }
    }

    /// Teardown finished
    pub fn mark_closed(&mut self) {
        self.phase = SessionPhase::Closed;
    }
}
