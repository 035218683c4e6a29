//! Error types for batch orchestration.
//!
//! Two layers: `BatchError` is fatal to a whole batch and only arises
//! during setup, before any job runs. `JobError` fails a single job and
//! never aborts the rest of the batch.

use std::io;

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::process::ProcessError;

/// Fatal batch-setup failure. Surfaced immediately; no job runs after it.
#[derive(Error, Debug)]
pub enum BatchError {
    /// A required external tool is missing from PATH.
    #[error("required tool '{tool}' not found in PATH")]
    ToolUnavailable { tool: String },

    /// Jobs of more than one pipeline kind were submitted together.
    #[error("batch mixes pipeline kinds: {0}")]
    MixedPipelines(String),

    /// Batch infrastructure could not be set up (log file, directories).
    #[error("batch setup failed during {operation}: {source}")]
    Setup {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl BatchError {
    pub fn tool_unavailable(tool: impl Into<String>) -> Self {
        Self::ToolUnavailable { tool: tool.into() }
    }

    pub fn setup(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Setup {
            operation: operation.into(),
            source,
        }
    }
}

/// Failure of a single job.
#[derive(Error, Debug)]
pub enum JobError {
    /// The job's inputs are unusable (missing cue audio, unreadable sheet).
    #[error("{0}")]
    InvalidInput(String),

    /// An external tool ran and exited nonzero.
    #[error("{tool} failed with exit code {exit_code}")]
    ToolExecutionFailed { tool: String, exit_code: i32 },

    /// The tool reported success but the expected output is missing or
    /// empty. Cleanup is withheld.
    #[error("output verification failed: {0}")]
    OutputVerificationFailed(String),

    /// Tag read/write failed for this file.
    #[error(transparent)]
    MetadataIo(#[from] MetadataError),

    /// The tool could not be spawned at all.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// File I/O error with operation context.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl JobError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn tool_failed(tool: impl Into<String>, exit_code: i32) -> Self {
        Self::ToolExecutionFailed {
            tool: tool.into(),
            exit_code,
        }
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::OutputVerificationFailed(message.into())
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for job execution.
pub type JobExecResult<T> = Result<T, JobError>;

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;
