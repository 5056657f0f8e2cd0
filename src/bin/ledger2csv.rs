//! CLI binary for ledger2csv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ledger2csv::{
    extract, inspect, ExtractionConfig, ExtractionProgressCallback, ProgressCallback, RunSummary,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live page counter. Pages finish out of order across chunks, so only
/// failures get their own line; successes just advance the bar.
struct CliProgressCallback {
    bar: ProgressBar,
    records: AtomicUsize,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            records: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>6}/{len} pages  {msg}  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.set_message("");
        self.bar.reset_eta();
    }

    fn refresh_message(&self) {
        let records = self.records.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        if errors == 0 {
            self.bar.set_message(dim(&format!("{records} records")));
        } else {
            self.bar.set_message(format!(
                "{}  {}",
                dim(&format!("{records} records")),
                red(&format!("{errors} failed"))
            ));
        }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize, chunks: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Extracting {total_pages} pages in {chunks} chunk(s)…"
            ))
        ));
    }

    fn on_page_complete(&self, _page: usize, records: usize) {
        self.records.fetch_add(records, Ordering::Relaxed);
        self.refresh_message();
        self.bar.inc(1);
    }

    fn on_page_error(&self, page: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);

        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar
            .println(format!("  {} Page {:>6}  {}", red("✗"), page, red(&msg)));
        self.refresh_message();
        self.bar.inc(1);
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();

        let failed = summary.failed_pages;
        if failed == 0 && summary.failed_chunks.is_empty() {
            eprintln!(
                "{} {} records from {} pages",
                green("✔"),
                bold(&summary.records_written.to_string()),
                summary.processed_pages
            );
        } else {
            eprintln!(
                "{} {} records from {}/{} pages  ({} failed pages, {} failed chunks)",
                cyan("⚠"),
                bold(&summary.records_written.to_string()),
                summary.processed_pages,
                summary.total_pages,
                red(&failed.to_string()),
                red(&summary.failed_chunks.len().to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a ledger
  ledger2csv --path ledger.pdf --csv ledger.csv --log ledger.log

  # Page count and chunk plan only
  ledger2csv --path ledger.pdf --inspect-only

  # Machine-readable run summary
  ledger2csv --path ledger.pdf --csv out.csv --log out.log --json > summary.json

OUTPUT:
  The CSV has no header row; each line is date,code,amount,content.
  Fields are written as-is, so a comma inside content shifts the columns.
  Both files are opened in append mode; rerunning appends duplicates.
  Failed pages are listed in the log file. The exit code is 0 even when
  some pages failed, so check the log. Every completed run ends with
  "All pages processed. Time execute: <elapsed>" on stderr.

ENVIRONMENT VARIABLES:
  LEDGER2CSV_PATH   Default for --path
  LEDGER2CSV_CSV    Default for --csv
  LEDGER2CSV_LOG    Default for --log
  PDFIUM_LIB_PATH   Path to an existing libpdfium
  RUST_LOG          Override the tracing filter
"#;

/// Extract donation-ledger records from a tabular PDF into CSV.
#[derive(Parser, Debug)]
#[command(
    name = "ledger2csv",
    version,
    about = "Extract donation-ledger records from a tabular PDF into CSV",
    long_about = "Detect the ruled table on every page of a ledger PDF, regroup wrapped rows \
into records, and append one CSV line per record. Pages are processed in parallel chunks; \
pages that cannot be parsed are logged and skipped.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Ledger PDF to read.
    #[arg(long, env = "LEDGER2CSV_PATH")]
    path: PathBuf,

    /// CSV file to append records to.
    #[arg(long, env = "LEDGER2CSV_CSV", required_unless_present = "inspect_only")]
    csv: Option<PathBuf>,

    /// Log file to append failed pages to.
    #[arg(long, env = "LEDGER2CSV_LOG", required_unless_present = "inspect_only")]
    log: Option<PathBuf>,

    /// Print the run summary as JSON.
    #[arg(long, env = "LEDGER2CSV_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "LEDGER2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Print page count and chunk plan only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LEDGER2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the closing timing line.
    #[arg(short, long, env = "LEDGER2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The per-page "Success get and write at" lines are INFO; keep them out
    // of the way while the progress bar is drawn.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let plan = inspect(&cli.path, &ExtractionConfig::default())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?
            );
        } else {
            println!("File:         {}", cli.path.display());
            println!("Pages:        {}", plan.page_count);
            println!("Chunk size:   {}", plan.chunk_size);
            println!("Chunks:       {}", plan.chunks.len());
            for (start, end) in &plan.chunks {
                println!("  {:>8}..{:<8}", start, end);
            }
        }
        return Ok(());
    }

    // clap enforces both unless --inspect-only.
    let csv = cli.csv.clone().context("--csv is required")?;
    let log = cli.log.clone().context("--log is required")?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let mut builder = ExtractionConfig::builder();
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run extraction ───────────────────────────────────────────────────
    let summary = extract(&cli.path, &csv, &log, &config)
        .await
        .context("Extraction failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        if !show_progress && (summary.failed_pages > 0 || !summary.failed_chunks.is_empty()) {
            eprintln!(
                "{} failed pages, {} failed chunks  →  {}",
                summary.failed_pages,
                summary.failed_chunks.len(),
                log.display()
            );
        }
    }

    // Printed on every successful run, including --json and --quiet; stderr
    // keeps the JSON summary on stdout parseable.
    eprintln!("{}", finish_line(started.elapsed()));

    Ok(())
}

/// Closing line with the total wall-clock time of the run.
fn finish_line(elapsed: Duration) -> String {
    format!("All pages processed. Time execute: {:?}", elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_line_reports_elapsed_time() {
        assert_eq!(
            finish_line(Duration::from_millis(1500)),
            "All pages processed. Time execute: 1.5s"
        );
    }

    #[test]
    fn quiet_and_json_still_parse_with_required_paths() {
        let cli = Cli::try_parse_from([
            "ledger2csv", "--path", "a.pdf", "--csv", "a.csv", "--log", "a.log", "--json",
            "--quiet",
        ])
        .unwrap();
        assert!(cli.json && cli.quiet);
        assert_eq!(cli.csv, Some(PathBuf::from("a.csv")));
    }

    #[test]
    fn inspect_only_does_not_need_outputs() {
        let cli = Cli::try_parse_from(["ledger2csv", "--path", "a.pdf", "--inspect-only"]).unwrap();
        assert!(cli.inspect_only);
        assert!(cli.csv.is_none());
    }
}
