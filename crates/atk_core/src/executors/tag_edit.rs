//! Tag editing executor.
//!
//! Applies the batch's tri-state tag edits to one file per job. Failures
//! are isolated: a file that cannot be tagged fails alone and the batch
//! moves on.

use crate::metadata;
use crate::models::{BatchConfig, JobDescriptor, TagEdit};
use crate::orchestrator::{JobError, JobExecResult};

use super::{ExecContext, ExecOutcome, JobExecutor};

pub struct TagEditExecutor;

impl TagEditExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TagEditExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl JobExecutor for TagEditExecutor {
    fn name(&self) -> &str {
        "TagEdit"
    }

    fn execute(
        &self,
        job: &JobDescriptor,
        config: &BatchConfig,
        ctx: &ExecContext<'_>,
    ) -> JobExecResult<ExecOutcome> {
        if !job.source.is_file() {
            return Err(JobError::invalid_input(format!(
                "source file not found: {}",
                job.source.display()
            )));
        }

        let edits = &config.tag_edits;
        if edits.is_empty() {
            return Ok(ExecOutcome::skipped("no tag changes specified"));
        }

        let (set_count, clear_count) =
            edits
                .iter()
                .fold((0usize, 0usize), |(set, clear), (_, edit)| match edit {
                    TagEdit::Set(_) => (set + 1, clear),
                    TagEdit::Clear => (set, clear + 1),
                    TagEdit::Keep => (set, clear),
                });

        ctx.logger.info(&format!(
            "Updating tags for {} ({} set, {} cleared)",
            job.display_name(),
            set_count,
            clear_count
        ));

        metadata::write_tags(&job.source, edits)?;

        Ok(ExecOutcome::Success {
            message: format!("{set_count} field(s) set, {clear_count} cleared"),
            artifacts: vec![job.source.clone()],
            cleanup: Vec::new(),
        })
    }
}
