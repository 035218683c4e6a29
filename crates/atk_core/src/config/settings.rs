//! Settings struct with TOML-based sections.

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool name overrides.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Cover download options.
    #[serde(default)]
    pub covers: CoverSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration for output and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Default output folder override for split batches. Empty means
    /// "beside the input".
    #[serde(default)]
    pub output_folder: String,

    /// Folder for batch log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Names (or paths) of the external tools the executors invoke.
///
/// Bare names are resolved through `PATH` before a batch starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    #[serde(default = "default_cue_splitter")]
    pub cue_splitter: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_cue_splitter() -> String {
    "ffcuesplitter".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            cue_splitter: default_cue_splitter(),
        }
    }
}

/// Cover download options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverSettings {
    /// Download timeout in seconds.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// User agent sent with cover requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_download_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "AudioToolkit/0.1".to_string()
}

impl Default for CoverSettings {
    fn default() -> Self {
        Self {
            download_timeout_secs: default_download_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Show timestamps in batch log files.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Mirror external tool output into the progress stream.
    #[serde(default)]
    pub verbose_tool_output: bool,

    /// Number of tool-output lines replayed after a failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: usize,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> usize {
    15
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            show_timestamps: default_true(),
            verbose_tool_output: false,
            error_tail: default_error_tail(),
        }
    }
}

impl LoggingSettings {
    /// Convert to the logger's runtime configuration.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            show_timestamps: self.show_timestamps,
            verbose_tool_output: self.verbose_tool_output,
            error_tail: self.error_tail,
        }
    }
}
