//! Pipeline configuration

use std::time::Duration;

/// Result text the inference service returns when it found nothing
pub const NO_RESULT_TEXT: &str = "result is None";

/// Configuration shared by every dispatch pipeline of a server
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Identical results on a stream within this window are suppressed
    pub debounce_period: Duration,

    /// Maximum bytes accumulated for one frame before the stream is failed
    pub max_frame_size: usize,

    /// Deadline for a single inference call
    pub inference_timeout: Duration,

    /// Result texts that are never forwarded to the client
    pub ignored_results: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_period: Duration::from_secs(2),
            max_frame_size: 4 * 1024 * 1024, // 4MB
            inference_timeout: Duration::from_secs(3),
            ignored_results: vec![NO_RESULT_TEXT.to_string()],
        }
    }
}

impl PipelineConfig {
    /// Set the debounce period
    pub fn debounce_period(mut self, period: Duration) -> Self {
        self.debounce_period = period;
        self
    }

    /// Set the maximum frame size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the inference timeout
    pub fn inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    /// Add a result text to the ignore list
    pub fn ignore_result(mut self, text: impl Into<String>) -> Self {
        self.ignored_results.push(text.into());
        self
    }

    /// Forward every result, including placeholders
    pub fn clear_ignored_results(mut self) -> Self {
        self.ignored_results.clear();
        self
    }

    /// Whether a result text is on the ignore list
    pub fn is_ignored(&self, text: &str) -> bool {
        self.ignored_results.iter().any(|t| t == text)
    }
}
