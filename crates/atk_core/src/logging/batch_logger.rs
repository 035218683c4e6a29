//! Per-batch logger with file and channel output.
//!
//! The logger is the single producer of the batch's progress stream: it
//! assigns the sequence numbers, so emission order and sequence order are
//! the same thing. It also keeps a tail buffer of external tool output to
//! replay when a tool fails.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use super::types::LogConfig;
use crate::models::{BatchEvent, BatchId, ProgressEvent, Severity};

/// Per-batch logger with dual output (log file + event channel).
pub struct BatchLogger {
    batch_id: BatchId,
    log_path: PathBuf,
    file_writer: Mutex<Option<BufWriter<File>>>,
    events: Sender<BatchEvent>,
    config: LogConfig,
    seq: AtomicU64,
    tail: Mutex<VecDeque<String>>,
}

impl BatchLogger {
    /// Create a logger writing to `<log_dir>/batch-<id>.log`.
    pub fn new(
        batch_id: BatchId,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        events: Sender<BatchEvent>,
    ) -> std::io::Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("batch-{batch_id}.log"));
        let file = File::create(&log_path)?;

        Ok(Self {
            batch_id,
            log_path,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            events,
            config,
            seq: AtomicU64::new(0),
            tail: Mutex::new(VecDeque::new()),
        })
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Path of the batch log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn info(&self, message: &str) {
        self.emit(Severity::Info, message.to_string());
    }

    pub fn warn(&self, message: &str) {
        self.emit(Severity::Warning, format!("[!] {message}"));
    }

    pub fn error(&self, message: &str) {
        self.emit(Severity::Error, format!("[!] {message}"));
    }

    /// Log the command line of an external tool invocation.
    pub fn command(&self, command: &str) {
        self.emit(Severity::Info, format!("$ {command}"));
    }

    /// Record one line of external tool output.
    ///
    /// Buffered for the failure tail; only forwarded to the stream when
    /// verbose tool output is configured.
    pub fn tool_output(&self, line: &str) {
        {
            let mut tail = self.tail.lock();
            if tail.len() >= self.config.error_tail {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }

        if self.config.verbose_tool_output {
            self.emit(Severity::Info, format!("    {line}"));
        }
    }

    /// Replay the buffered tool output after a failure, then clear it.
    pub fn show_tail(&self, header: &str) {
        let lines: Vec<String> = {
            let mut tail = self.tail.lock();
            tail.drain(..).collect()
        };
        if lines.is_empty() {
            return;
        }

        self.emit(Severity::Error, format!("[!] {header}:"));
        for line in lines {
            self.emit(Severity::Error, format!("    {line}"));
        }
    }

    /// Discard buffered tool output (called between jobs).
    pub fn clear_tail(&self) {
        self.tail.lock().clear();
    }

    /// Send a terminal event (summary or abort) through the channel.
    pub fn send_terminal(&self, event: BatchEvent) {
        self.flush();
        let _ = self.events.send(event);
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(writer) = self.file_writer.lock().as_mut() {
            let _ = writer.flush();
        }
    }

    fn emit(&self, severity: Severity, message: String) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);

        if let Some(writer) = self.file_writer.lock().as_mut() {
            let line = if self.config.show_timestamps {
                format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
            } else {
                message.clone()
            };
            let _ = writeln!(writer, "{line}");
        }

        let _ = self.events.send(BatchEvent::Progress(ProgressEvent {
            seq,
            severity,
            message,
        }));
    }
}

impl Drop for BatchLogger {
    fn drop(&mut self) {
        self.flush();
        *self.file_writer.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use tempfile::tempdir;

    fn logger_with_channel(
        dir: &Path,
        config: LogConfig,
    ) -> (BatchLogger, crossbeam_channel::Receiver<BatchEvent>) {
        let (tx, rx) = unbounded();
        let logger = BatchLogger::new(BatchId::new(), dir, config, tx).unwrap();
        (logger, rx)
    }

    fn drain_progress(rx: &crossbeam_channel::Receiver<BatchEvent>) -> Vec<ProgressEvent> {
        rx.try_iter()
            .filter_map(|e| match e {
                BatchEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn creates_log_file_and_mirrors_events() {
        let dir = tempdir().unwrap();
        let (logger, rx) = logger_with_channel(dir.path(), LogConfig::default());

        logger.info("starting");
        logger.error("went wrong");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("starting"));
        assert!(content.contains("[!] went wrong"));

        let events = drain_progress(&rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].severity, Severity::Info);
        assert_eq!(events[1].severity, Severity::Error);
    }

    #[test]
    fn sequence_numbers_are_strictly_increasing() {
        let dir = tempdir().unwrap();
        let (logger, rx) = logger_with_channel(dir.path(), LogConfig::default());

        for i in 0..20 {
            logger.info(&format!("line {i}"));
        }

        let events = drain_progress(&rx);
        assert_eq!(events.len(), 20);
        for pair in events.windows(2) {
            assert!(pair[0].seq < pair[1].seq);
        }
    }

    #[test]
    fn tool_output_is_buffered_until_failure() {
        let dir = tempdir().unwrap();
        let (logger, rx) = logger_with_channel(dir.path(), LogConfig::default());

        for i in 0..20 {
            logger.tool_output(&format!("frame={i}"));
        }
        // Nothing forwarded yet in quiet mode.
        assert!(drain_progress(&rx).is_empty());

        logger.show_tail("ffmpeg output");
        let events = drain_progress(&rx);
        // Header plus the capped tail.
        assert_eq!(events.len(), 1 + LogConfig::default().error_tail);
        assert!(events[0].message.contains("ffmpeg output"));
        assert!(events.last().unwrap().message.contains("frame=19"));
    }

    #[test]
    fn clear_tail_discards_buffer() {
        let dir = tempdir().unwrap();
        let (logger, rx) = logger_with_channel(dir.path(), LogConfig::default());

        logger.tool_output("leftover");
        logger.clear_tail();
        logger.show_tail("should not appear");

        assert!(drain_progress(&rx).is_empty());
    }
}
