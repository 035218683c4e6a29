//! Process-wide configuration.
//!
//! `Settings` holds the defaults a UI persists between runs (paths, tool
//! overrides, cover download options); per-batch options live in
//! [`BatchConfig`](crate::models::BatchConfig) instead.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{CoverSettings, LoggingSettings, PathSettings, Settings, ToolSettings};
