//! ATK Core - Backend engine for Audio Toolkit
//!
//! This crate contains all batch-processing logic with zero UI
//! dependencies: job executors for the four pipelines (cue splitting,
//! WAV conversion, tag editing, cover embedding), file discovery, the
//! metadata accessor, and the batch orchestrator that runs everything on
//! worker threads and streams progress back to the caller.
//!
//! Typical use from a UI:
//!
//! ```no_run
//! use atk_core::config::Settings;
//! use atk_core::models::{BatchConfig, BatchEvent, JobDescriptor, PipelineKind};
//! use atk_core::orchestrator::BatchManager;
//!
//! let manager = BatchManager::new(Settings::default(), ".logs");
//! let handle = manager.submit(
//!     vec![JobDescriptor::new("/music/rips", PipelineKind::Convert)],
//!     BatchConfig::default(),
//! );
//!
//! for event in handle.events.iter() {
//!     match event {
//!         BatchEvent::Progress(p) => println!("{}", p.message),
//!         BatchEvent::Finished(summary) => {
//!             println!("{}", summary.digest());
//!             break;
//!         }
//!         BatchEvent::Aborted { reason, .. } => {
//!             eprintln!("batch aborted: {reason}");
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod config;
pub mod covers;
pub mod cue;
pub mod discovery;
pub mod executors;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod process;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
