//! Per-pipeline job executors.
//!
//! One `JobExecutor` implementation per pipeline kind, all behind the same
//! execute contract. The orchestrator builds the matching executor once per
//! batch and calls it for every resolved job in order.

mod convert;
mod embed_cover;
mod split;
mod tag_edit;

pub use convert::ConvertExecutor;
pub use embed_cover::EmbedCoverExecutor;
pub use split::SplitExecutor;
pub use tag_edit::TagEditExecutor;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Settings;
use crate::covers::{CoverFetcher, CoverResolver};
use crate::logging::BatchLogger;
use crate::models::{BatchConfig, JobDescriptor, PipelineKind};
use crate::orchestrator::{BatchError, BatchResult, JobError, JobExecResult};
use crate::process::find_tool;

/// What a successful execute call produced.
#[derive(Debug)]
pub enum ExecOutcome {
    Success {
        message: String,
        /// Paths the job created.
        artifacts: Vec<PathBuf>,
        /// Source paths that may now be deleted.
        cleanup: Vec<PathBuf>,
    },
    /// The job did not apply (idempotent skip, no cover available, ...).
    Skipped(String),
}

impl ExecOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
            artifacts: Vec::new(),
            cleanup: Vec::new(),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::Skipped(message.into())
    }
}

/// External tool paths resolved once per batch.
///
/// Only the tools the batch's pipeline needs are looked up; a missing one
/// fails the batch before any job runs.
#[derive(Debug, Default)]
pub struct ResolvedTools {
    ffmpeg: Option<PathBuf>,
    ffprobe: Option<PathBuf>,
    cue_splitter: Option<PathBuf>,
}

impl ResolvedTools {
    /// Resolve the tools `kind` requires from `settings`.
    pub fn resolve(settings: &Settings, kind: PipelineKind) -> BatchResult<Self> {
        let mut tools = Self::default();

        match kind {
            PipelineKind::Split => {
                tools.cue_splitter = Some(lookup(&settings.tools.cue_splitter)?);
                tools.ffmpeg = Some(lookup(&settings.tools.ffmpeg)?);
                tools.ffprobe = Some(lookup(&settings.tools.ffprobe)?);
            }
            PipelineKind::Convert | PipelineKind::EmbedCover => {
                tools.ffmpeg = Some(lookup(&settings.tools.ffmpeg)?);
            }
            PipelineKind::TagEdit => {}
        }

        Ok(tools)
    }

    pub fn ffmpeg(&self) -> JobExecResult<&Path> {
        require(&self.ffmpeg, "ffmpeg")
    }

    pub fn ffprobe(&self) -> JobExecResult<&Path> {
        require(&self.ffprobe, "ffprobe")
    }

    pub fn cue_splitter(&self) -> JobExecResult<&Path> {
        require(&self.cue_splitter, "cue splitter")
    }
}

fn lookup(name: &str) -> BatchResult<PathBuf> {
    // A configured absolute/relative path is taken as-is; bare names go
    // through PATH.
    let as_path = Path::new(name);
    if as_path.components().count() > 1 {
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }
        return Err(BatchError::tool_unavailable(name));
    }

    find_tool(name).ok_or_else(|| BatchError::tool_unavailable(name))
}

fn require<'a>(tool: &'a Option<PathBuf>, name: &str) -> JobExecResult<&'a Path> {
    tool.as_deref()
        .ok_or_else(|| JobError::invalid_input(format!("{name} was not resolved for this batch")))
}

/// Shared, read-only context handed to every execute call.
pub struct ExecContext<'a> {
    pub logger: &'a BatchLogger,
    pub tools: &'a ResolvedTools,
}

/// The per-item execution contract, one implementation per pipeline.
pub trait JobExecutor: Send + Sync {
    /// Executor name for logs and error context.
    fn name(&self) -> &str;

    /// Run one job. Errors fail that job only.
    fn execute(
        &self,
        job: &JobDescriptor,
        config: &BatchConfig,
        ctx: &ExecContext<'_>,
    ) -> JobExecResult<ExecOutcome>;
}

/// Build the executor for a batch of the given kind.
pub fn build_executor(
    kind: PipelineKind,
    config: &BatchConfig,
    settings: &Settings,
) -> Box<dyn JobExecutor> {
    match kind {
        PipelineKind::Split => Box::new(SplitExecutor::new()),
        PipelineKind::Convert => Box::new(ConvertExecutor::new()),
        PipelineKind::TagEdit => Box::new(TagEditExecutor::new()),
        PipelineKind::EmbedCover => {
            let fetcher = CoverFetcher::new(
                Duration::from_secs(settings.covers.download_timeout_secs),
                settings.covers.user_agent.clone(),
            );
            let resolver = CoverResolver::new(fetcher, config.cover.url.clone());
            Box::new(EmbedCoverExecutor::new(resolver))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_edit_resolves_without_tools() {
        let settings = Settings::default();
        let tools = ResolvedTools::resolve(&settings, PipelineKind::TagEdit).unwrap();
        assert!(tools.ffmpeg().is_err());
    }

    #[test]
    fn missing_tool_fails_resolution() {
        let mut settings = Settings::default();
        settings.tools.ffmpeg = "definitely-not-a-real-tool-xyz".to_string();

        let result = ResolvedTools::resolve(&settings, PipelineKind::Convert);
        assert!(matches!(result, Err(BatchError::ToolUnavailable { .. })));
    }

    #[test]
    fn executor_names_match_kinds() {
        let config = BatchConfig::default();
        let settings = Settings::default();
        assert_eq!(
            build_executor(PipelineKind::Split, &config, &settings).name(),
            "Split"
        );
        assert_eq!(
            build_executor(PipelineKind::EmbedCover, &config, &settings).name(),
            "EmbedCover"
        );
    }
}
