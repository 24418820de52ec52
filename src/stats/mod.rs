//! Relay statistics

pub mod metrics;

pub use metrics::{SessionStats, StreamStats};
