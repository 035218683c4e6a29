//! Batch runner: sequential job loop with cooperative cancellation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Settings;
use crate::discovery;
use crate::executors::{build_executor, ExecContext, ExecOutcome, JobExecutor, ResolvedTools};
use crate::logging::BatchLogger;
use crate::models::{
    BatchConfig, BatchId, BatchState, BatchSummary, JobDescriptor, JobResult, PipelineKind,
};

use super::errors::{BatchError, BatchResult};

/// Handle for cancelling a running batch.
///
/// Cancellation is honored between jobs only; an in-flight job always runs
/// to completion.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs one batch to completion inside the worker's execution context.
pub struct BatchRunner {
    batch_id: BatchId,
    settings: Settings,
    cancelled: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(batch_id: BatchId, settings: Settings) -> Self {
        Self {
            batch_id,
            settings,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Get a handle that cancels this runner at the next job boundary.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run the batch: validate, discover, execute each job, summarize.
    ///
    /// Errors returned here are batch-setup failures; per-job failures are
    /// recorded in the summary instead.
    pub fn run(
        &self,
        submitted: &[JobDescriptor],
        config: &BatchConfig,
        logger: &BatchLogger,
    ) -> BatchResult<BatchSummary> {
        let kind = match validate_kinds(submitted)? {
            Some(kind) => kind,
            None => {
                logger.warn("Batch contained no jobs");
                return Ok(BatchSummary::from_results(
                    self.batch_id,
                    BatchState::Completed,
                    Vec::new(),
                    0,
                ));
            }
        };

        // Fail fast on missing tools, before any job runs.
        let tools = ResolvedTools::resolve(&self.settings, kind)?;

        let inputs: Vec<_> = submitted.iter().map(|j| j.source.clone()).collect();
        let files = discovery::expand(&inputs, kind.allowed_extensions());
        if files.is_empty() {
            logger.warn(&format!(
                "No {} input files found in the submitted paths",
                kind.allowed_extensions().join("/")
            ));
            return Ok(BatchSummary::from_results(
                self.batch_id,
                BatchState::Completed,
                Vec::new(),
                0,
            ));
        }

        let jobs: Vec<JobDescriptor> = files
            .into_iter()
            .map(|path| JobDescriptor::new(path, kind))
            .collect();

        logger.info(&format!(
            "Starting {} batch: {} job(s)",
            kind.as_str(),
            jobs.len()
        ));

        let executor = build_executor(kind, config, &self.settings);
        Ok(self.run_jobs(&jobs, config, executor.as_ref(), &tools, logger))
    }

    /// The sequential job loop. Split out so tests can drive it with a
    /// mock executor.
    fn run_jobs(
        &self,
        jobs: &[JobDescriptor],
        config: &BatchConfig,
        executor: &dyn JobExecutor,
        tools: &ResolvedTools,
        logger: &BatchLogger,
    ) -> BatchSummary {
        let total = jobs.len();
        let mut results: Vec<JobResult> = Vec::with_capacity(total);
        let mut cancelled = false;

        let ctx = ExecContext { logger, tools };

        for (i, job) in jobs.iter().enumerate() {
            // Cancellation is polled between jobs, never mid-job.
            if self.is_cancelled() {
                logger.warn(&format!(
                    "Cancellation requested; {} of {} job(s) not attempted",
                    total - i,
                    total
                ));
                cancelled = true;
                break;
            }

            logger.clear_tail();
            logger.info(&format!(
                "[{}/{}] Processing: {}",
                i + 1,
                total,
                job.display_name()
            ));

            let result = match executor.execute(job, config, &ctx) {
                Ok(ExecOutcome::Success {
                    message,
                    artifacts,
                    cleanup,
                }) => {
                    logger.info(&format!("  [ok] {message}"));
                    // Sources are only ever deleted here, after the job
                    // reached Success with verified output.
                    for path in &cleanup {
                        safe_delete(path, logger);
                    }
                    JobResult::success(job.clone(), message)
                        .with_artifacts(artifacts)
                        .with_cleanup(cleanup)
                }
                Ok(ExecOutcome::Skipped(message)) => {
                    logger.info(&format!("  [skip] {message}"));
                    JobResult::skipped(job.clone(), message)
                }
                Err(e) => {
                    logger.error(&format!("  {}: {}", job.display_name(), e));
                    JobResult::failed(job.clone(), e.to_string())
                }
            };
            results.push(result);

            logger.info(&format!("Progress: {}/{}", i + 1, total));
        }

        let state = if cancelled {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        let not_attempted = total - results.len();

        let summary = BatchSummary::from_results(self.batch_id, state, results, not_attempted);
        logger.info(&summary.digest());
        summary
    }
}

/// Check all submitted jobs share one pipeline kind and return it.
fn validate_kinds(jobs: &[JobDescriptor]) -> BatchResult<Option<PipelineKind>> {
    let mut kinds = jobs.iter().map(|j| j.kind);
    let first = match kinds.next() {
        Some(kind) => kind,
        None => return Ok(None),
    };

    if let Some(other) = kinds.find(|k| *k != first) {
        return Err(BatchError::MixedPipelines(format!(
            "{} and {}",
            first.as_str(),
            other.as_str()
        )));
    }

    Ok(Some(first))
}

/// Delete a cleanup-eligible file, logging the outcome. A missing file is
/// not an error.
fn safe_delete(path: &Path, logger: &BatchLogger) {
    if !path.exists() {
        logger.info(&format!(
            "  [cleanup] not found, skipping: {}",
            path.display()
        ));
        return;
    }

    match std::fs::remove_file(path) {
        Ok(()) => logger.info(&format!("  [cleanup] deleted {}", path.display())),
        Err(e) => logger.warn(&format!(
            "Failed to delete {}: {}",
            path.display(),
            e
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::JobExecutor;
    use crate::logging::LogConfig;
    use crate::models::{BatchEvent, JobOutcome};
    use crate::orchestrator::JobError;
    use crossbeam_channel::{unbounded, Receiver};
    use parking_lot::Mutex;
    use std::fs;
    use tempfile::tempdir;

    fn logger(dir: &Path) -> (BatchLogger, Receiver<BatchEvent>) {
        let (tx, rx) = unbounded();
        let logger = BatchLogger::new(BatchId::new(), dir, LogConfig::default(), tx).unwrap();
        (logger, rx)
    }

    /// Scripted executor: each call pops the next outcome; optionally
    /// cancels the batch after a given number of executions.
    struct ScriptedExecutor {
        script: Mutex<Vec<Result<ExecOutcome, JobError>>>,
        cancel_after: Option<(usize, CancelHandle)>,
        calls: Mutex<usize>,
    }

    impl ScriptedExecutor {
        fn new(script: Vec<Result<ExecOutcome, JobError>>) -> Self {
            Self {
                script: Mutex::new(script),
                cancel_after: None,
                calls: Mutex::new(0),
            }
        }

        fn cancelling_after(mut self, calls: usize, handle: CancelHandle) -> Self {
            self.cancel_after = Some((calls, handle));
            self
        }
    }

    impl JobExecutor for ScriptedExecutor {
        fn name(&self) -> &str {
            "Scripted"
        }

        fn execute(
            &self,
            _job: &JobDescriptor,
            _config: &BatchConfig,
            _ctx: &ExecContext<'_>,
        ) -> Result<ExecOutcome, JobError> {
            let mut calls = self.calls.lock();
            *calls += 1;
            if let Some((after, handle)) = &self.cancel_after {
                if *calls == *after {
                    handle.cancel();
                }
            }
            self.script.lock().remove(0)
        }
    }

    fn jobs(n: usize) -> Vec<JobDescriptor> {
        (0..n)
            .map(|i| JobDescriptor::new(format!("/music/{i}.wav"), PipelineKind::Convert))
            .collect()
    }

    #[test]
    fn outcome_counts_add_up_to_submitted_jobs() {
        let dir = tempdir().unwrap();
        let (logger, _rx) = logger(dir.path());
        let runner = BatchRunner::new(BatchId::new(), Settings::default());

        let executor = ScriptedExecutor::new(vec![
            Ok(ExecOutcome::success("one")),
            Ok(ExecOutcome::skipped("two")),
            Err(JobError::tool_failed("ffmpeg", 1)),
            Ok(ExecOutcome::success("four")),
        ]);

        let summary = runner.run_jobs(
            &jobs(4),
            &BatchConfig::default(),
            &executor,
            &ResolvedTools::default(),
            &logger,
        );

        assert_eq!(summary.state, BatchState::Completed);
        assert_eq!(summary.succeeded + summary.skipped + summary.failed, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_attempted, 0);
    }

    #[test]
    fn failure_does_not_abort_remaining_jobs() {
        let dir = tempdir().unwrap();
        let (logger, _rx) = logger(dir.path());
        let runner = BatchRunner::new(BatchId::new(), Settings::default());

        let executor = ScriptedExecutor::new(vec![
            Err(JobError::tool_failed("ffmpeg", 1)),
            Ok(ExecOutcome::success("second still runs")),
        ]);

        let summary = runner.run_jobs(
            &jobs(2),
            &BatchConfig::default(),
            &executor,
            &ResolvedTools::default(),
            &logger,
        );

        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.results[0].outcome, JobOutcome::Failed);
        assert_eq!(summary.results[1].outcome, JobOutcome::Success);
    }

    #[test]
    fn cancellation_between_jobs_leaves_rest_not_attempted() {
        let dir = tempdir().unwrap();
        let (logger, _rx) = logger(dir.path());
        let runner = BatchRunner::new(BatchId::new(), Settings::default());

        let script: Vec<_> = (0..10).map(|_| Ok(ExecOutcome::success("done"))).collect();
        let executor = ScriptedExecutor::new(script).cancelling_after(3, runner.cancel_handle());

        let summary = runner.run_jobs(
            &jobs(10),
            &BatchConfig::default(),
            &executor,
            &ResolvedTools::default(),
            &logger,
        );

        // Cancellation lands after job 3 finishes; jobs 4-10 never start.
        assert_eq!(summary.state, BatchState::Cancelled);
        assert_eq!(summary.results.len(), 3);
        assert!(summary
            .results
            .iter()
            .all(|r| r.outcome == JobOutcome::Success));
        assert_eq!(summary.not_attempted, 7);
    }

    #[test]
    fn cleanup_happens_only_on_success() {
        let dir = tempdir().unwrap();
        let survivor = dir.path().join("survivor.cue");
        let victim = dir.path().join("victim.cue");
        fs::write(&survivor, b"cue").unwrap();
        fs::write(&victim, b"cue").unwrap();

        let (logger, _rx) = logger(dir.path());
        let runner = BatchRunner::new(BatchId::new(), Settings::default());

        let executor = ScriptedExecutor::new(vec![
            // Failed job lists a cleanup candidate that must survive.
            Err(JobError::verification("tracks missing")),
            Ok(ExecOutcome::Success {
                message: "split".to_string(),
                artifacts: Vec::new(),
                cleanup: vec![victim.clone()],
            }),
        ]);

        let summary = runner.run_jobs(
            &jobs(2),
            &BatchConfig::default(),
            &executor,
            &ResolvedTools::default(),
            &logger,
        );

        assert_eq!(summary.failed, 1);
        assert!(survivor.exists());
        assert!(!victim.exists());
    }

    #[test]
    fn mixed_kinds_are_rejected() {
        let submitted = vec![
            JobDescriptor::new("/a.cue", PipelineKind::Split),
            JobDescriptor::new("/b.wav", PipelineKind::Convert),
        ];
        assert!(matches!(
            validate_kinds(&submitted),
            Err(BatchError::MixedPipelines(_))
        ));
    }

    #[test]
    fn empty_submission_completes_with_empty_summary() {
        let dir = tempdir().unwrap();
        let (logger, _rx) = logger(dir.path());
        let runner = BatchRunner::new(BatchId::new(), Settings::default());

        let summary = runner
            .run(&[], &BatchConfig::default(), &logger)
            .unwrap();
        assert_eq!(summary.state, BatchState::Completed);
        assert_eq!(summary.attempted(), 0);
    }

    #[test]
    fn run_discovers_folder_inputs_in_order() {
        let dir = tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir(&music).unwrap();
        fs::write(music.join("b.mp3"), b"x").unwrap();
        fs::write(music.join("a.mp3"), b"x").unwrap();
        fs::write(music.join("notes.txt"), b"x").unwrap();

        let (logger, _rx) = logger(dir.path());
        let runner = BatchRunner::new(BatchId::new(), Settings::default());

        // TagEdit with an empty edit set: every discovered file is skipped,
        // which is enough to observe discovery order in the results.
        let submitted = vec![JobDescriptor::new(&music, PipelineKind::TagEdit)];
        let summary = runner
            .run(&submitted, &BatchConfig::default(), &logger)
            .unwrap();

        assert_eq!(summary.attempted(), 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.results[0].job.source, music.join("a.mp3"));
        assert_eq!(summary.results[1].job.source, music.join("b.mp3"));
    }

    #[test]
    fn missing_tool_fails_the_batch_before_any_job() {
        let dir = tempdir().unwrap();
        let wav = dir.path().join("a.wav");
        fs::write(&wav, b"x").unwrap();

        let (logger, _rx) = logger(dir.path());
        let mut settings = Settings::default();
        settings.tools.ffmpeg = "definitely-not-a-real-tool-xyz".to_string();
        let runner = BatchRunner::new(BatchId::new(), settings);

        let submitted = vec![JobDescriptor::new(&wav, PipelineKind::Convert)];
        let result = runner.run(&submitted, &BatchConfig::default(), &logger);
        assert!(matches!(result, Err(BatchError::ToolUnavailable { .. })));
    }
}
