//! WAV to FLAC conversion executor.
//!
//! Converts beside the source, never overwriting: a pre-existing target
//! means the job is already done and is reported as a skip. In
//! metadata-copy mode the tags of a sibling MP3 are applied to the fresh
//! FLAC through the metadata accessor.

use std::ffi::OsStr;
use std::path::Path;

use crate::metadata;
use crate::models::{BatchConfig, ConvertMode, JobDescriptor};
use crate::orchestrator::{JobError, JobExecResult};
use crate::process::run_tool;

use super::{ExecContext, ExecOutcome, JobExecutor};

pub struct ConvertExecutor;

impl ConvertExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConvertExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl JobExecutor for ConvertExecutor {
    fn name(&self) -> &str {
        "Convert"
    }

    fn execute(
        &self,
        job: &JobDescriptor,
        config: &BatchConfig,
        ctx: &ExecContext<'_>,
    ) -> JobExecResult<ExecOutcome> {
        let wav_path = &job.source;
        if !wav_path.is_file() {
            return Err(JobError::invalid_input(format!(
                "source file not found: {}",
                wav_path.display()
            )));
        }

        let flac_path = wav_path.with_extension("flac");
        if flac_path.exists() {
            return Ok(ExecOutcome::skipped(format!(
                "FLAC already exists: {}",
                flac_path.display()
            )));
        }

        // Metadata-copy mode needs its donor before any work happens.
        let mp3_path = wav_path.with_extension("mp3");
        if config.convert_mode == ConvertMode::CopyMp3Metadata && !mp3_path.is_file() {
            return Ok(ExecOutcome::skipped(format!(
                "corresponding MP3 not found: {}",
                mp3_path.display()
            )));
        }

        ctx.logger
            .info(&format!("Converting {} to FLAC", job.display_name()));

        let ffmpeg = ctx.tools.ffmpeg()?;
        let args: Vec<&OsStr> = vec![
            OsStr::new("-i"),
            wav_path.as_os_str(),
            OsStr::new("-c:a"),
            OsStr::new("flac"),
            OsStr::new("-loglevel"),
            OsStr::new("info"),
            OsStr::new("-y"),
            flac_path.as_os_str(),
        ];

        let output = run_tool(ffmpeg, &args, None)?;
        for line in output.stderr.lines() {
            ctx.logger.tool_output(line);
        }

        if !output.success() {
            ctx.logger.show_tail("ffmpeg output");
            return Err(JobError::tool_failed("ffmpeg", output.exit_code));
        }

        verify_nonempty(&flac_path)?;

        let message = if config.convert_mode == ConvertMode::CopyMp3Metadata {
            let snapshot = metadata::read_tags(&mp3_path)?;
            metadata::write_tags(&flac_path, &snapshot.to_tag_set())?;
            format!(
                "converted with tags copied from {}",
                mp3_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default()
            )
        } else {
            "converted".to_string()
        };

        Ok(ExecOutcome::Success {
            message,
            artifacts: vec![flac_path],
            cleanup: Vec::new(),
        })
    }
}

fn verify_nonempty(path: &Path) -> JobExecResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(JobError::verification(format!(
            "converted file missing or empty: {}",
            path.display()
        ))),
    }
}
