//! Pipeline driver: count pages, partition, fan chunks out to workers.
//!
//! Pages are split up front into contiguous chunks ([`partition`]); each chunk
//! runs on its own blocking thread with its own document handle, and at most
//! `config.workers` chunks run at once. Per-page work is assumed uniform, so
//! the static split stands in for a dynamic work queue.

use crate::config::ExtractionConfig;
use crate::error::LedgerError;
use crate::output::{ChunkReport, DocumentPlan, FailureEntry, RunSummary};
use crate::pipeline::chunk::{partition, run_chunk, Chunk, ChunkAborted};
use crate::pipeline::grid::GridSource;
use crate::pipeline::input;
use crate::pipeline::pdfium::PdfiumSource;
use crate::pipeline::sink::{Sink, SinkWriter};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract every ledger record in a PDF into `csv_path`, logging failures to
/// `log_path`.
///
/// This is the primary entry point for the library. Both files are opened in
/// append mode.
///
/// # Returns
/// `Ok(RunSummary)` once every chunk has finished, even if pages or whole
/// chunks failed (check `summary.failed_pages` and `summary.failed_chunks`,
/// or read the log file).
///
/// # Errors
/// Returns `Err(LedgerError)` only when the run cannot start: the document is
/// missing or unreadable, pdfium cannot be bound, or an output file cannot be
/// opened.
pub async fn extract(
    input: impl AsRef<Path>,
    csv_path: impl AsRef<Path>,
    log_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<RunSummary, LedgerError> {
    let source: Arc<dyn GridSource> = Arc::new(PdfiumSource::new(config.table));
    extract_with_source(source, input, csv_path, log_path, config).await
}

/// [`extract`] against any [`GridSource`].
pub async fn extract_with_source(
    source: Arc<dyn GridSource>,
    input: impl AsRef<Path>,
    csv_path: impl AsRef<Path>,
    log_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<RunSummary, LedgerError> {
    let pdf_path = input.as_ref().to_path_buf();
    input::validate_local(&pdf_path)?;

    let (sink, writer) =
        SinkWriter::spawn(csv_path.as_ref(), log_path.as_ref(), config.quoting).await?;
    let sink: Arc<dyn Sink> = Arc::new(sink);

    let result = extract_to_sink(source, &pdf_path, Arc::clone(&sink), config).await;
    drop(sink);
    let stats = writer.finish().await?;

    let mut summary = result?;
    summary.records_written = stats.records;
    summary.failures_logged = stats.failures;
    Ok(summary)
}

/// Run the whole pipeline, appending into an injected sink.
///
/// The document path is not validated here; [`extract_with_source`] does that.
pub async fn extract_to_sink(
    source: Arc<dyn GridSource>,
    input: &Path,
    sink: Arc<dyn Sink>,
    config: &ExtractionConfig,
) -> Result<RunSummary, LedgerError> {
    let total_start = Instant::now();
    let pdf_path = input.to_path_buf();
    info!("Starting extraction: {}", pdf_path.display());

    // ── Step 1: Count pages ──────────────────────────────────────────────
    let total_pages = count_pages(&source, &pdf_path).await?;
    info!("PDF has {} pages", total_pages);

    // ── Step 2: Partition ────────────────────────────────────────────────
    let chunks = partition(total_pages, config.chunk_size);
    debug!(
        "{} chunks of up to {} pages across {} workers",
        chunks.len(),
        config.chunk_size,
        config.workers
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total_pages, chunks.len());
    }

    // ── Step 3: Fan out ──────────────────────────────────────────────────
    let outcomes: Vec<ChunkOutcome> = stream::iter(chunks.iter().copied().map(|chunk| {
        let source = Arc::clone(&source);
        let sink = Arc::clone(&sink);
        let path = pdf_path.clone();
        let config = config.clone();
        async move {
            let worker_sink = Arc::clone(&sink);
            let joined = tokio::task::spawn_blocking(move || {
                run_chunk_isolated(source.as_ref(), &path, chunk, &config, worker_sink.as_ref())
            })
            .await;
            match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Chunk {}..{} panicked: {}", chunk.start, chunk.end, e);
                    let message = format!("chunk worker panicked: {}", e);
                    let logged = tokio::task::spawn_blocking(move || {
                        log_chunk_failure(sink.as_ref(), chunk, message)
                    })
                    .await
                    .unwrap_or(false);
                    ChunkOutcome {
                        chunk,
                        report: ChunkReport {
                            start: chunk.start,
                            end: chunk.end,
                            ..ChunkReport::default()
                        },
                        aborted: true,
                        logged,
                    }
                }
            }
        }
    }))
    .buffer_unordered(config.workers)
    .collect()
    .await;

    // ── Step 4: Summarise ────────────────────────────────────────────────
    let mut summary = RunSummary {
        total_pages,
        chunks: chunks.len(),
        workers: config.workers,
        ..RunSummary::default()
    };
    for outcome in outcomes {
        let report = &outcome.report;
        summary.processed_pages += report.visited_pages - report.failed_pages;
        summary.failed_pages += report.failed_pages;
        summary.records_written += report.records;
        summary.failures_logged += report.failed_pages;
        if outcome.aborted {
            summary
                .failed_chunks
                .push((outcome.chunk.start, outcome.chunk.end));
            if outcome.logged {
                summary.failures_logged += 1;
            }
        }
    }
    summary.failed_chunks.sort_unstable();
    summary.elapsed_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {}/{} pages, {} records, {} failed pages, {}ms",
        summary.processed_pages,
        total_pages,
        summary.records_written,
        summary.failed_pages,
        summary.elapsed_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(&summary);
    }

    Ok(summary)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input: impl AsRef<Path>,
    csv_path: impl AsRef<Path>,
    log_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<RunSummary, LedgerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LedgerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input, csv_path, log_path, config))
}

/// Page count and chunk plan for a PDF, without extracting anything.
pub async fn inspect(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<DocumentPlan, LedgerError> {
    let source: Arc<dyn GridSource> = Arc::new(PdfiumSource::new(config.table));
    inspect_with_source(source, input, config).await
}

/// [`inspect`] against any [`GridSource`].
pub async fn inspect_with_source(
    source: Arc<dyn GridSource>,
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<DocumentPlan, LedgerError> {
    let pdf_path = input.as_ref().to_path_buf();
    input::validate_local(&pdf_path)?;
    let page_count = count_pages(&source, &pdf_path).await?;

    Ok(DocumentPlan {
        page_count,
        chunk_size: config.chunk_size,
        chunks: partition(page_count, config.chunk_size)
            .into_iter()
            .map(|c| (c.start, c.end))
            .collect(),
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn count_pages(source: &Arc<dyn GridSource>, path: &Path) -> Result<usize, LedgerError> {
    let source = Arc::clone(source);
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || source.page_count(&path))
        .await
        .map_err(|e| LedgerError::Internal(format!("Page count task panicked: {}", e)))?
}

/// What one chunk did, whether or not it ran to the end.
struct ChunkOutcome {
    chunk: Chunk,
    report: ChunkReport,
    aborted: bool,
    /// A chunk failure entry reached the sink.
    logged: bool,
}

/// Run one chunk; if it aborts, log a chunk failure entry and keep its partial totals.
fn run_chunk_isolated(
    source: &dyn GridSource,
    path: &Path,
    chunk: Chunk,
    config: &ExtractionConfig,
    sink: &dyn Sink,
) -> ChunkOutcome {
    match run_chunk(source, path, chunk, config, sink) {
        Ok(report) => {
            debug!(
                "Chunk {}..{} done: {} pages, {} records, {} failed",
                chunk.start, chunk.end, report.visited_pages, report.records, report.failed_pages
            );
            ChunkOutcome {
                chunk,
                report,
                aborted: false,
                logged: false,
            }
        }
        Err(ChunkAborted { report, error }) => {
            warn!(
                "Chunk {}..{} aborted after {} pages: {}",
                chunk.start, chunk.end, report.visited_pages, error
            );
            let logged = log_chunk_failure(sink, chunk, error.to_string());
            ChunkOutcome {
                chunk,
                report,
                aborted: true,
                logged,
            }
        }
    }
}

/// Append a chunk failure entry; returns whether the sink accepted it.
///
/// Blocks on a [`crate::pipeline::sink::ChannelSink`], so call it off the async runtime.
fn log_chunk_failure(sink: &dyn Sink, chunk: Chunk, message: String) -> bool {
    let entry = FailureEntry::Chunk {
        start: chunk.start,
        end: chunk.end,
        message,
    };
    match sink.append_failure(&entry) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not log chunk failure: {}", e);
            false
        }
    }
}
