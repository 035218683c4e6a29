//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Configuration for per-batch logging behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Prefix log-file lines with a `HH:MM:SS` timestamp.
    pub show_timestamps: bool,
    /// Mirror external tool output lines into the event stream instead of
    /// only buffering them for the failure tail.
    pub verbose_tool_output: bool,
    /// Number of buffered tool-output lines replayed after a failure.
    pub error_tail: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            verbose_tool_output: false,
            error_tail: 15,
        }
    }
}
