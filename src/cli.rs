//! Terminal plumbing shared by the `pdfs2images` and `images2rags` binaries.
//!
//! Only compiled with the `cli` feature.

use crate::progress::PipelineProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

pub fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
pub fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
pub fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
pub fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Logging ──────────────────────────────────────────────────────────────────

/// Install the stderr subscriber.
///
/// INFO-level library logs are suppressed while the progress bar is active;
/// `RUST_LOG` overrides everything.
pub fn init_logging(verbose: bool, quiet: bool, show_progress: bool) {
    let filter = if verbose {
        "debug"
    } else if quiet || show_progress {
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
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress: one bar per document plus a log line per page.
pub struct CliProgressCallback {
    bar: ProgressBar,
    /// Verb shown as the bar prefix, e.g. "Rendering".
    verb: &'static str,
    /// Unit for the per-page size column, e.g. "bytes".
    unit: &'static str,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Start with a spinner; the bar takes its length from each document.
    pub fn new(verb: &'static str, unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            verb,
            unit,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, doc: &str, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(progress_style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(format!("{} {}", self.verb, doc));
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self, page_number: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_number))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{} {total_documents} documents…", self.verb))
        ));
    }

    fn on_document_start(&self, doc: &str, total_pages: usize) {
        self.activate_bar(doc, total_pages);
    }

    fn on_document_skipped(&self, doc: &str, reason: &str) {
        self.bar
            .println(format!("  {} {}  {}", dim("–"), doc, dim(&format!("skipped: {reason}"))));
    }

    fn on_page_start(&self, _doc: &str, page_number: usize, _total_pages: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_number, Instant::now());
        }
        self.bar.set_message(format!("page {page_number}"));
    }

    fn on_page_complete(&self, doc: &str, page_number: usize, total_pages: usize, output_len: usize) {
        let elapsed = self.page_elapsed_secs(page_number);
        self.bar.println(format!(
            "  {} {} page {:>3}/{:<3}  {:<14}  {}",
            green("✓"),
            doc,
            page_number,
            total_pages,
            dim(&format!("{output_len:>7} {}", self.unit)),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, doc: &str, pages: usize) {
        self.bar
            .println(format!("{} {}  {} pages", green("✔"), bold(doc), pages));
    }

    fn on_run_complete(&self, documents: usize, pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} documents, {} pages",
            green("✔"),
            bold(&documents.to_string()),
            bold(&pages.to_string())
        );
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
