//! Output sink: where records and failure entries end up.
//!
//! Workers never touch the output files themselves. They hold a cloneable
//! [`ChannelSink`] that forwards whole lines to one [`SinkWriter`] task, which
//! owns both files and appends each line in arrival order. Lines from
//! different chunks therefore never interleave mid-line.

use crate::config::CsvQuoting;
use crate::error::LedgerError;
use crate::output::{FailureEntry, Record};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Lines buffered between workers and the writer before senders block.
const CHANNEL_CAPACITY: usize = 4096;

/// Append-only destination for records and failure entries.
pub trait Sink: Send + Sync {
    /// Append one record as one CSV line.
    fn append_record(&self, record: &Record) -> Result<(), LedgerError>;

    /// Append one line to the failure log.
    fn append_failure(&self, entry: &FailureEntry) -> Result<(), LedgerError>;
}

/// Lines written by a [`SinkWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkStats {
    pub records: usize,
    pub failures: usize,
}

#[derive(Debug)]
enum SinkLine {
    Record(String),
    Failure(String),
}

/// Sender half handed to every chunk runner.
///
/// Sends block when the writer falls behind, so call it from blocking threads
/// (`spawn_blocking`), not from async tasks.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SinkLine>,
    quoting: CsvQuoting,
}

impl Sink for ChannelSink {
    fn append_record(&self, record: &Record) -> Result<(), LedgerError> {
        let line = record.to_csv_line(self.quoting)?;
        self.tx
            .blocking_send(SinkLine::Record(line))
            .map_err(|_| LedgerError::SinkClosed)
    }

    fn append_failure(&self, entry: &FailureEntry) -> Result<(), LedgerError> {
        self.tx
            .blocking_send(SinkLine::Failure(format!("{entry}\n")))
            .map_err(|_| LedgerError::SinkClosed)
    }
}

/// The single task that owns the CSV and log files.
pub struct SinkWriter {
    handle: JoinHandle<Result<SinkStats, LedgerError>>,
}

impl SinkWriter {
    /// Open both files for appending and start the writer task.
    ///
    /// Existing content is kept; a rerun appends after it.
    pub async fn spawn(
        csv_path: &Path,
        log_path: &Path,
        quoting: CsvQuoting,
    ) -> Result<(ChannelSink, SinkWriter), LedgerError> {
        let csv = open_append(csv_path).await?;
        let log = open_append(log_path).await?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let handle = tokio::spawn(write_lines(
            rx,
            (csv, csv_path.to_path_buf()),
            (log, log_path.to_path_buf()),
        ));

        Ok((ChannelSink { tx, quoting }, SinkWriter { handle }))
    }

    /// Wait until every [`ChannelSink`] clone is dropped and all lines are flushed.
    pub async fn finish(self) -> Result<SinkStats, LedgerError> {
        self.handle
            .await
            .map_err(|e| LedgerError::Internal(format!("Sink writer panicked: {}", e)))?
    }
}

async fn open_append(path: &Path) -> Result<File, LedgerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LedgerError::SinkWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| LedgerError::SinkWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

async fn write_lines(
    mut rx: mpsc::Receiver<SinkLine>,
    (mut csv, csv_path): (File, PathBuf),
    (mut log, log_path): (File, PathBuf),
) -> Result<SinkStats, LedgerError> {
    let mut stats = SinkStats::default();

    while let Some(line) = rx.recv().await {
        match line {
            SinkLine::Record(line) => {
                append(&mut csv, &csv_path, &line).await?;
                stats.records += 1;
            }
            SinkLine::Failure(line) => {
                append(&mut log, &log_path, &line).await?;
                stats.failures += 1;
            }
        }
    }

    flush(&mut csv, &csv_path).await?;
    flush(&mut log, &log_path).await?;
    debug!(
        "Sink closed: {} records, {} failure entries",
        stats.records, stats.failures
    );
    Ok(stats)
}

async fn append(file: &mut File, path: &Path, line: &str) -> Result<(), LedgerError> {
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| LedgerError::SinkWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

async fn flush(file: &mut File, path: &Path) -> Result<(), LedgerError> {
    file.flush().await.map_err(|e| LedgerError::SinkWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Collects records and failures in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
    failures: Mutex<Vec<FailureEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records appended so far, in append order.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Failure entries appended so far, in append order.
    pub fn failures(&self) -> Vec<FailureEntry> {
        self.failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

impl Sink for MemorySink {
    fn append_record(&self, record: &Record) -> Result<(), LedgerError> {
        self.records
            .lock()
            .map_err(|_| LedgerError::Internal("record buffer poisoned".into()))?
            .push(record.clone());
        Ok(())
    }

    fn append_failure(&self, entry: &FailureEntry) -> Result<(), LedgerError> {
        self.failures
            .lock()
            .map_err(|_| LedgerError::Internal("failure buffer poisoned".into()))?
            .push(entry.clone());
        Ok(())
    }
}
