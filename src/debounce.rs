//! Result debouncing
//!
//! Inference on consecutive frames of a steady scene tends to return the same
//! text over and over. The debouncer lets a text through once and then
//! suppresses repeats of it on the same stream until the period has elapsed.
//! A different text is always let through.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::reassembly::StreamId;

/// Last accepted result for one stream
#[derive(Debug, Clone)]
struct DebounceState {
    last_text: String,
    last_accepted_at: Instant,
}

/// Per-stream result debouncer
///
/// Shared by all pipelines of a session. Calls for the same stream are
/// already serialized by that stream's pipeline; the map itself tolerates
/// concurrent insertion for different streams.
#[derive(Debug)]
pub struct ResultDebouncer {
    period: Duration,
    states: DashMap<StreamId, DebounceState>,
}

impl ResultDebouncer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            states: DashMap::new(),
        }
    }

    /// Debounce period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Decide whether a result should be forwarded
    ///
    /// Returns false iff `text` equals the stream's last accepted text and
    /// less than the period has passed since it was accepted. Otherwise the
    /// result becomes the stream's last accepted one.
    pub fn accept(&self, stream_id: StreamId, text: &str, now: Instant) -> bool {
        match self.states.entry(stream_id) {
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                if state.last_text == text
                    && now.saturating_duration_since(state.last_accepted_at) < self.period
                {
                    return false;
                }
                state.last_text = text.to_owned();
                state.last_accepted_at = now;
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(DebounceState {
                    last_text: text.to_owned(),
                    last_accepted_at: now,
                });
                true
            }
        }
    }

    /// Forget a stream's state
    pub fn remove(&self, stream_id: StreamId) {
        self.states.remove(&stream_id);
    }

    /// Number of streams with state
    pub fn stream_count(&self) -> usize {
        self.states.len()
    }
}
