//! Batch manager: submission interface for the UI collaborator.
//!
//! Each submitted batch gets its own worker thread, its own log file, and
//! its own single-producer event channel. The caller never blocks while a
//! batch runs; it drains [`BatchEvent`]s from the handle at its own pace
//! and receives exactly one terminal event per batch.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver};
use parking_lot::Mutex;

use crate::config::Settings;
use crate::logging::BatchLogger;
use crate::models::{BatchConfig, BatchEvent, BatchId, JobDescriptor};

use super::batch::{BatchRunner, CancelHandle};

/// What the caller gets back from `submit`: the batch id and the receiving
/// end of the batch's event channel.
pub struct BatchHandle {
    pub id: BatchId,
    pub events: Receiver<BatchEvent>,
}

struct RunningBatch {
    cancel: CancelHandle,
    thread: Option<JoinHandle<()>>,
}

/// Owns the worker threads of all in-flight batches.
///
/// Batches run independently; the manager keeps no state shared between
/// them beyond this registry.
pub struct BatchManager {
    settings: Settings,
    log_dir: PathBuf,
    running: Arc<Mutex<HashMap<BatchId, RunningBatch>>>,
}

impl BatchManager {
    pub fn new(settings: Settings, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            log_dir: log_dir.into(),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Submit a batch and return immediately.
    ///
    /// The batch runs on its own worker thread. The returned handle's
    /// channel carries ordered progress events followed by exactly one
    /// terminal event (`Finished` or `Aborted`).
    pub fn submit(&self, jobs: Vec<JobDescriptor>, config: BatchConfig) -> BatchHandle {
        let batch_id = BatchId::new();
        let (tx, rx) = unbounded();

        let logger = match BatchLogger::new(
            batch_id,
            &self.log_dir,
            self.settings.logging.to_log_config(),
            tx.clone(),
        ) {
            Ok(logger) => logger,
            Err(e) => {
                // No log file means no batch; surface the abort through
                // the channel the caller is about to read.
                let _ = tx.send(BatchEvent::Aborted {
                    batch_id,
                    reason: format!("failed to create batch log: {e}"),
                });
                return BatchHandle {
                    id: batch_id,
                    events: rx,
                };
            }
        };

        let runner = BatchRunner::new(batch_id, self.settings.clone());
        let cancel = runner.cancel_handle();
        let registry = Arc::clone(&self.running);

        let thread = std::thread::spawn(move || {
            tracing::info!("Batch {} started ({} submitted job(s))", batch_id, jobs.len());

            match runner.run(&jobs, &config, &logger) {
                Ok(summary) => {
                    tracing::info!("Batch {} finished: {}", batch_id, summary.digest());
                    logger.send_terminal(BatchEvent::Finished(summary));
                }
                Err(e) => {
                    tracing::error!("Batch {} aborted: {}", batch_id, e);
                    logger.error(&format!("Batch aborted: {e}"));
                    logger.send_terminal(BatchEvent::Aborted {
                        batch_id,
                        reason: e.to_string(),
                    });
                }
            }

            registry.lock().remove(&batch_id);
        });

        self.running.lock().insert(
            batch_id,
            RunningBatch {
                cancel,
                thread: Some(thread),
            },
        );

        BatchHandle {
            id: batch_id,
            events: rx,
        }
    }

    /// Request cancellation of a running batch.
    ///
    /// Honored at the next job boundary; the in-flight job finishes first.
    /// Returns false when the batch is unknown or already done.
    pub fn cancel(&self, batch_id: BatchId) -> bool {
        match self.running.lock().get(&batch_id) {
            Some(batch) => {
                batch.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a batch's worker is still registered.
    pub fn is_running(&self, batch_id: BatchId) -> bool {
        self.running.lock().contains_key(&batch_id)
    }

    /// Block until the given batch's worker thread exits.
    pub fn join(&self, batch_id: BatchId) {
        let handle = self
            .running
            .lock()
            .get_mut(&batch_id)
            .and_then(|b| b.thread.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Cancel everything and wait for all workers to exit.
    pub fn shutdown(&self) {
        let handles: Vec<(BatchId, Option<JoinHandle<()>>)> = {
            let mut running = self.running.lock();
            running
                .iter_mut()
                .map(|(id, batch)| {
                    batch.cancel.cancel();
                    (*id, batch.thread.take())
                })
                .collect()
        };

        for (id, handle) in handles {
            if let Some(handle) = handle {
                tracing::debug!("Waiting for batch {} to stop", id);
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchState, JobOutcome, PipelineKind, Severity};
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn manager(log_dir: &std::path::Path) -> BatchManager {
        BatchManager::new(Settings::default(), log_dir)
    }

    /// Drain a handle until its terminal event, with a timeout per recv.
    fn collect_events(handle: &BatchHandle) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        loop {
            let event = handle
                .events
                .recv_timeout(Duration::from_secs(10))
                .expect("batch produced no terminal event");
            let terminal = matches!(
                event,
                BatchEvent::Finished(_) | BatchEvent::Aborted { .. }
            );
            events.push(event);
            if terminal {
                return events;
            }
        }
    }

    #[test]
    fn submit_runs_in_background_and_finishes() {
        let dir = tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir(&music).unwrap();
        fs::write(music.join("a.mp3"), b"x").unwrap();
        fs::write(music.join("b.mp3"), b"x").unwrap();

        let manager = manager(dir.path());
        // Empty tag set: every job is an idempotent skip, no tools needed.
        let handle = manager.submit(
            vec![JobDescriptor::new(&music, PipelineKind::TagEdit)],
            BatchConfig::default(),
        );

        let events = collect_events(&handle);
        let summary = match events.last() {
            Some(BatchEvent::Finished(summary)) => summary,
            other => panic!("expected Finished, got {other:?}"),
        };

        assert_eq!(summary.state, BatchState::Completed);
        assert_eq!(summary.attempted(), 2);
        assert_eq!(
            summary.succeeded + summary.skipped + summary.failed,
            summary.attempted()
        );
        assert!(summary.results.iter().all(|r| r.outcome == JobOutcome::Skipped));

        manager.join(handle.id);
        assert!(!manager.is_running(handle.id));
    }

    #[test]
    fn event_stream_is_ordered_with_one_terminal() {
        let dir = tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir(&music).unwrap();
        for i in 0..5 {
            fs::write(music.join(format!("{i}.flac")), b"x").unwrap();
        }

        let manager = manager(dir.path());
        let handle = manager.submit(
            vec![JobDescriptor::new(&music, PipelineKind::TagEdit)],
            BatchConfig::default(),
        );

        let events = collect_events(&handle);
        let terminal_count = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::Finished(_) | BatchEvent::Aborted { .. }))
            .count();
        assert_eq!(terminal_count, 1);

        let seqs: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Progress(p) => Some(p.seq),
                _ => None,
            })
            .collect();
        assert!(!seqs.is_empty());
        assert!(seqs.windows(2).all(|pair| pair[0] < pair[1]));

        manager.join(handle.id);
    }

    #[test]
    fn missing_tool_aborts_with_error_event() {
        let dir = tempdir().unwrap();
        let wav = dir.path().join("a.wav");
        fs::write(&wav, b"x").unwrap();

        let mut settings = Settings::default();
        settings.tools.ffmpeg = "definitely-not-a-real-tool-xyz".to_string();
        let manager = BatchManager::new(settings, dir.path());

        let handle = manager.submit(
            vec![JobDescriptor::new(&wav, PipelineKind::Convert)],
            BatchConfig::default(),
        );

        let events = collect_events(&handle);
        match events.last() {
            Some(BatchEvent::Aborted { reason, .. }) => {
                assert!(reason.contains("definitely-not-a-real-tool-xyz"));
            }
            other => panic!("expected Aborted, got {other:?}"),
        }
        // The abort was also logged, not silent.
        assert!(events.iter().any(|e| matches!(
            e,
            BatchEvent::Progress(p) if p.severity == Severity::Error
        )));

        manager.join(handle.id);
    }

    #[test]
    fn cancel_unknown_batch_returns_false() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        assert!(!manager.cancel(BatchId::new()));
    }

    #[test]
    fn independent_batches_run_concurrently() {
        let dir = tempdir().unwrap();
        let music_a = dir.path().join("a");
        let music_b = dir.path().join("b");
        fs::create_dir(&music_a).unwrap();
        fs::create_dir(&music_b).unwrap();
        fs::write(music_a.join("x.mp3"), b"x").unwrap();
        fs::write(music_b.join("y.mp3"), b"x").unwrap();

        let manager = manager(dir.path());
        let first = manager.submit(
            vec![JobDescriptor::new(&music_a, PipelineKind::TagEdit)],
            BatchConfig::default(),
        );
        let second = manager.submit(
            vec![JobDescriptor::new(&music_b, PipelineKind::TagEdit)],
            BatchConfig::default(),
        );
        assert_ne!(first.id, second.id);

        for handle in [&first, &second] {
            let events = collect_events(handle);
            assert!(matches!(events.last(), Some(BatchEvent::Finished(_))));
        }

        manager.join(first.id);
        manager.join(second.id);
    }
}
