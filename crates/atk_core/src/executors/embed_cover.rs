//! Cover embedding executor.
//!
//! Resolves one cover per directory (downloaded or local) and remuxes it
//! into each file as an attached picture. The remux goes to a temporary
//! file that replaces the original only on success, so a failed embed
//! leaves the source untouched.

use std::ffi::OsStr;
use std::path::Path;

use crate::covers::CoverResolver;
use crate::models::{BatchConfig, JobDescriptor};
use crate::orchestrator::{JobError, JobExecResult};
use crate::process::run_tool;

use super::{ExecContext, ExecOutcome, JobExecutor};

pub struct EmbedCoverExecutor {
    resolver: CoverResolver,
}

impl EmbedCoverExecutor {
    pub fn new(resolver: CoverResolver) -> Self {
        Self { resolver }
    }
}

impl JobExecutor for EmbedCoverExecutor {
    fn name(&self) -> &str {
        "EmbedCover"
    }

    fn execute(
        &self,
        job: &JobDescriptor,
        _config: &BatchConfig,
        ctx: &ExecContext<'_>,
    ) -> JobExecResult<ExecOutcome> {
        let target = &job.source;
        if !target.is_file() {
            return Err(JobError::invalid_input(format!(
                "source file not found: {}",
                target.display()
            )));
        }

        let dir = target.parent().unwrap_or(Path::new("."));
        let cover = match self.resolver.resolve(dir) {
            Some(path) => path,
            None => {
                return Ok(ExecOutcome::skipped(format!(
                    "no cover found or downloaded for {}",
                    dir.display()
                )));
            }
        };

        ctx.logger.info(&format!(
            "Embedding {} into {}",
            cover
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| cover.display().to_string()),
            job.display_name()
        ));

        let tmp_output = target.with_extension("tmp_cover.flac");
        let ffmpeg = ctx.tools.ffmpeg()?;

        let args: Vec<&OsStr> = vec![
            OsStr::new("-i"),
            target.as_os_str(),
            OsStr::new("-i"),
            cover.as_os_str(),
            OsStr::new("-map"),
            OsStr::new("0:a"),
            OsStr::new("-map"),
            OsStr::new("1"),
            OsStr::new("-c"),
            OsStr::new("copy"),
            OsStr::new("-map_metadata"),
            OsStr::new("0"),
            OsStr::new("-metadata:s:v"),
            OsStr::new("title=Album cover"),
            OsStr::new("-metadata:s:v"),
            OsStr::new("comment=Cover (front)"),
            OsStr::new("-disposition:v"),
            OsStr::new("attached_pic"),
            OsStr::new("-loglevel"),
            OsStr::new("info"),
            OsStr::new("-y"),
            tmp_output.as_os_str(),
        ];

        let output = run_tool(ffmpeg, &args, None)?;
        for line in output.stderr.lines() {
            ctx.logger.tool_output(line);
        }

        if !output.success() {
            ctx.logger.show_tail("ffmpeg output");
            remove_stale(&tmp_output);
            return Err(JobError::tool_failed("ffmpeg", output.exit_code));
        }

        match std::fs::metadata(&tmp_output) {
            Ok(meta) if meta.len() > 0 => {}
            _ => {
                remove_stale(&tmp_output);
                return Err(JobError::verification(format!(
                    "remuxed file missing or empty: {}",
                    tmp_output.display()
                )));
            }
        }

        std::fs::rename(&tmp_output, target).map_err(|e| {
            remove_stale(&tmp_output);
            JobError::io("replacing original after embed", e)
        })?;

        Ok(ExecOutcome::Success {
            message: "cover embedded".to_string(),
            artifacts: vec![target.clone()],
            cleanup: Vec::new(),
        })
    }
}

fn remove_stale(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Could not remove stale temp file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covers::CoverFetcher;
    use crate::executors::ResolvedTools;
    use crate::logging::{BatchLogger, LogConfig};
    use crate::models::{BatchId, PipelineKind};
    use crossbeam_channel::unbounded;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn executor() -> EmbedCoverExecutor {
        let fetcher = CoverFetcher::new(Duration::from_secs(1), "test");
        EmbedCoverExecutor::new(CoverResolver::new(fetcher, None))
    }

    fn context(dir: &Path) -> (BatchLogger, ResolvedTools) {
        let (tx, _rx) = unbounded();
        let logger = BatchLogger::new(BatchId::new(), dir, LogConfig::default(), tx).unwrap();
        (logger, ResolvedTools::default())
    }

    #[test]
    fn no_cover_anywhere_skips() {
        let dir = tempdir().unwrap();
        let flac = dir.path().join("track.flac");
        fs::write(&flac, b"flac-bytes").unwrap();

        let (logger, tools) = context(dir.path());
        let ctx = ExecContext {
            logger: &logger,
            tools: &tools,
        };

        let job = JobDescriptor::new(&flac, PipelineKind::EmbedCover);
        let result = executor()
            .execute(&job, &BatchConfig::default(), &ctx)
            .unwrap();
        assert!(matches!(result, ExecOutcome::Skipped(_)));
    }

    #[test]
    fn missing_target_is_invalid_input() {
        let dir = tempdir().unwrap();
        let (logger, tools) = context(dir.path());
        let ctx = ExecContext {
            logger: &logger,
            tools: &tools,
        };

        let job = JobDescriptor::new(dir.path().join("ghost.flac"), PipelineKind::EmbedCover);
        let result = executor().execute(&job, &BatchConfig::default(), &ctx);
        assert!(matches!(result, Err(JobError::InvalidInput(_))));
    }
}
