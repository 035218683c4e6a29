//! Batch logging and the progress/log channel.
//!
//! Every batch gets its own [`BatchLogger`]: each line is written to a
//! per-batch log file and mirrored into the caller's event channel as a
//! sequence-numbered [`ProgressEvent`](crate::models::ProgressEvent).

mod batch_logger;
mod types;

pub use batch_logger::BatchLogger;
pub use types::LogConfig;

/// Install a global `tracing` subscriber for ambient diagnostics.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
