//! Core data model shared across the engine.
//!
//! Types here describe *what* a batch is (jobs, configuration) and *what
//! came out of it* (results, summaries, progress events). They carry no
//! behavior beyond small accessors so they can be serialized and handed
//! across the UI boundary unchanged.

mod batch;
mod results;
mod tags;

pub use batch::{
    BatchConfig, CollectionLayout, ConvertMode, CoverSource, JobDescriptor, OutputFormat,
    OverwritePolicy, PipelineKind, COVER_CANDIDATES,
};
pub use results::{
    BatchEvent, BatchId, BatchState, BatchSummary, JobOutcome, JobResult, ProgressEvent, Severity,
};
pub use tags::{TagEdit, TagField, TagSet, TagSnapshot};
