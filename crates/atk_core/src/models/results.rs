//! Per-job results, batch summaries, and progress events.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::batch::JobDescriptor;

/// Identifier handed back by `submit` and accepted by `cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Batch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchState {
    #[default]
    Pending,
    Running,
    Completed,
    Cancelled,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// True once the batch will produce no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Outcome of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Success,
    Skipped,
    Failed,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Skipped => "Skipped",
            Self::Failed => "Failed",
        }
    }
}

/// Result of one job. Created exactly once, immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// The job this result belongs to.
    pub job: JobDescriptor,
    pub outcome: JobOutcome,
    /// Human-readable outcome message.
    pub message: String,
    /// Paths produced by the job.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
    /// Source paths the orchestrator may delete, contingent on this
    /// result being `Success`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_eligible: Vec<PathBuf>,
}

impl JobResult {
    pub fn success(job: JobDescriptor, message: impl Into<String>) -> Self {
        Self {
            job,
            outcome: JobOutcome::Success,
            message: message.into(),
            artifacts: Vec::new(),
            cleanup_eligible: Vec::new(),
        }
    }

    pub fn skipped(job: JobDescriptor, message: impl Into<String>) -> Self {
        Self {
            job,
            outcome: JobOutcome::Skipped,
            message: message.into(),
            artifacts: Vec::new(),
            cleanup_eligible: Vec::new(),
        }
    }

    pub fn failed(job: JobDescriptor, message: impl Into<String>) -> Self {
        Self {
            job,
            outcome: JobOutcome::Failed,
            message: message.into(),
            artifacts: Vec::new(),
            cleanup_eligible: Vec::new(),
        }
    }

    pub fn with_artifacts(mut self, artifacts: Vec<PathBuf>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_cleanup(mut self, cleanup: Vec<PathBuf>) -> Self {
        self.cleanup_eligible = cleanup;
        self
    }
}

/// Aggregate result of a batch, finalized when the last job completes or
/// the batch is cancelled between jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    /// Terminal state (`Completed` or `Cancelled`).
    pub state: BatchState,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Jobs never started because of cancellation.
    pub not_attempted: usize,
    /// Per-job results in execution order.
    pub results: Vec<JobResult>,
}

impl BatchSummary {
    /// Build a summary from collected results.
    pub fn from_results(
        batch_id: BatchId,
        state: BatchState,
        results: Vec<JobResult>,
        not_attempted: usize,
    ) -> Self {
        let mut succeeded = 0;
        let mut skipped = 0;
        let mut failed = 0;
        for result in &results {
            match result.outcome {
                JobOutcome::Success => succeeded += 1,
                JobOutcome::Skipped => skipped += 1,
                JobOutcome::Failed => failed += 1,
            }
        }
        Self {
            batch_id,
            state,
            succeeded,
            skipped,
            failed,
            not_attempted,
            results,
        }
    }

    /// Number of jobs that were attempted.
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    /// One-line digest for log output.
    pub fn digest(&self) -> String {
        format!(
            "{}: {} succeeded, {} skipped, {} failed, {} not attempted",
            self.state.as_str(),
            self.succeeded,
            self.skipped,
            self.failed,
            self.not_attempted
        )
    }
}

/// Severity of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One line of the progress/log stream. Strictly ordered by `seq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub seq: u64,
    pub severity: Severity,
    pub message: String,
}

/// What the caller receives on the batch event channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    /// A progress/log line.
    Progress(ProgressEvent),
    /// Terminal event: the batch ran to completion or was cancelled.
    Finished(BatchSummary),
    /// Terminal event: batch setup failed before any job ran.
    Aborted { batch_id: BatchId, reason: String },
}
