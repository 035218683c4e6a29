//! Cue-sheet splitting executor.
//!
//! Drives the external cue splitting tool, then verifies every expected
//! per-track output before marking any source file for cleanup. The
//! ordering is the safety invariant of this executor: verification failure
//! means every original input stays on disk untouched.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::cue::{sanitize_component, CueSheet};
use crate::models::{BatchConfig, CollectionLayout, JobDescriptor, OverwritePolicy};
use crate::orchestrator::{JobError, JobExecResult};
use crate::process::run_tool;

use super::{ExecContext, ExecOutcome, JobExecutor};

/// Log file the splitting tool drops in its output directory.
const SPLITTER_LOG: &str = "ffcuesplitter.log";

pub struct SplitExecutor;

impl SplitExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SplitExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl JobExecutor for SplitExecutor {
    fn name(&self) -> &str {
        "Split"
    }

    fn execute(
        &self,
        job: &JobDescriptor,
        config: &BatchConfig,
        ctx: &ExecContext<'_>,
    ) -> JobExecResult<ExecOutcome> {
        let cue_path = &job.source;
        let cue_dir = cue_path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let sheet = CueSheet::read(cue_path).map_err(|e| JobError::invalid_input(e.to_string()))?;

        let audio_path = sheet.resolve_audio().ok_or_else(|| {
            JobError::invalid_input(format!(
                "referenced audio file '{}' not found near cue sheet",
                sheet.audio_file
            ))
        })?;

        let output_dir = config
            .output_dir
            .clone()
            .unwrap_or_else(|| cue_dir.clone());
        let track_dir = output_dir.join(collection_subpath(config.collection, &sheet));

        let extension = match config.output_format.extension() {
            Some(ext) => ext.to_string(),
            // Byte-identical copy keeps the source container's extension.
            None => audio_path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_else(|| "flac".to_string()),
        };
        let expected = sheet.expected_track_names(&extension);

        if config.overwrite == OverwritePolicy::Never {
            let existing: Vec<&String> = expected
                .iter()
                .filter(|name| track_dir.join(name).exists())
                .collect();
            if !existing.is_empty() {
                return Ok(ExecOutcome::skipped(format!(
                    "{} output track(s) already exist in {} and overwrite is disabled",
                    existing.len(),
                    track_dir.display()
                )));
            }
        }

        ctx.logger.info(&format!(
            "Splitting {} ({} tracks) to {} as {}",
            job.display_name(),
            sheet.tracks.len(),
            track_dir.display(),
            extension
        ));

        let splitter = ctx.tools.cue_splitter()?;
        let ffmpeg = ctx.tools.ffmpeg()?;
        let ffprobe = ctx.tools.ffprobe()?;

        let mut args: Vec<&OsStr> = vec![
            OsStr::new("-i"),
            cue_path.as_os_str(),
            OsStr::new("-f"),
            OsStr::new(config.output_format.as_str()),
            OsStr::new("-o"),
            output_dir.as_os_str(),
            OsStr::new("-ow"),
            OsStr::new(config.overwrite.as_str()),
            OsStr::new("--ffmpeg-cmd"),
            ffmpeg.as_os_str(),
            OsStr::new("--ffprobe-cmd"),
            ffprobe.as_os_str(),
        ];
        let collection = config.collection.as_str();
        if !collection.is_empty() {
            args.push(OsStr::new("-c"));
            args.push(OsStr::new(collection));
        }

        ctx.logger.command(&format_command(splitter, &args));
        let output = run_tool(splitter, &args, Some(&cue_dir))?;

        for line in output.stdout.lines().chain(output.stderr.lines()) {
            ctx.logger.tool_output(line);
        }

        if !output.success() {
            ctx.logger.show_tail("splitter output");
            return Err(JobError::tool_failed("cue splitter", output.exit_code));
        }

        let artifacts = verify_outputs(&track_dir, &expected)?;

        // Only a fully verified split makes the originals deletable.
        let mut cleanup = vec![cue_path.clone(), audio_path];
        let rip_log = cue_path.with_extension("log");
        if rip_log.is_file() {
            cleanup.push(rip_log);
        }
        for candidate in [track_dir.join(SPLITTER_LOG), output_dir.join(SPLITTER_LOG)] {
            if candidate.is_file() && !cleanup.contains(&candidate) {
                cleanup.push(candidate);
                break;
            }
        }

        Ok(ExecOutcome::Success {
            message: format!(
                "split into {} track(s) in {}",
                artifacts.len(),
                track_dir.display()
            ),
            artifacts,
            cleanup,
        })
    }
}

/// Collection folder components for the configured layout.
///
/// Empty components (missing or fully sanitized-away names) are dropped
/// rather than producing empty path segments.
fn collection_subpath(layout: CollectionLayout, sheet: &CueSheet) -> PathBuf {
    let artist = sheet
        .performer
        .as_deref()
        .map(sanitize_component)
        .unwrap_or_default();
    let album = sheet
        .title
        .as_deref()
        .map(sanitize_component)
        .unwrap_or_default();

    let components: Vec<String> = match layout {
        CollectionLayout::Flat => Vec::new(),
        CollectionLayout::Artist => vec![artist],
        CollectionLayout::Album => vec![album],
        CollectionLayout::ArtistAlbum => vec![artist, album],
    };

    components
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect()
}

/// Check that every expected track exists with nonzero size.
///
/// Returns the verified paths, or the verification error naming what is
/// missing.
fn verify_outputs(track_dir: &Path, expected: &[String]) -> JobExecResult<Vec<PathBuf>> {
    let mut verified = Vec::with_capacity(expected.len());
    let mut missing = Vec::new();

    for name in expected {
        let path = track_dir.join(name);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => verified.push(path),
            _ => missing.push(name.clone()),
        }
    }

    if missing.is_empty() {
        Ok(verified)
    } else {
        Err(JobError::verification(format!(
            "{} of {} expected track(s) missing or empty in {}: {}",
            missing.len(),
            expected.len(),
            track_dir.display(),
            missing.join(", ")
        )))
    }
}

fn format_command(program: &Path, args: &[&OsStr]) -> String {
    let mut parts = vec![program.display().to_string()];
    parts.extend(args.iter().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}
