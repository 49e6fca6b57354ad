//! Stage 1 CLI: rasterise `pdfs/*.pdf` into `images/<doc>/<n>.png`.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RenderConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2rag::cli::{self, bold, dim, green, CliProgressCallback};
use pdf2rag::{pdfs_to_images, PipelineProgressCallback, ProgressCallback, RenderConfig};
use std::path::PathBuf;
use std::sync::Arc;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default layout: pdfs/*.pdf -> images/<doc>/<n>.png at 200 DPI
  pdfs2images

  # Higher resolution for small print
  pdfs2images --dpi 300

  # Other directories
  pdfs2images --input scans --output scan-images

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise ./ then the system path)
  PDF2RAG_PDFS_DIR        Same as --input
  PDF2RAG_IMAGES_DIR      Same as --output

SETUP:
  Pre-built pdfium libraries: https://github.com/bblanchon/pdfium-binaries/releases
  Place libpdfium next to where you run pdfs2images, or set PDFIUM_LIB_PATH.
"#;

/// Rasterise every PDF in a directory to one PNG per page.
#[derive(Parser, Debug)]
#[command(
    name = "pdfs2images",
    version,
    about = "Rasterise every PDF in a directory to one PNG per page",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned for *.pdf files.
    #[arg(short, long, env = "PDF2RAG_PDFS_DIR", default_value = "pdfs")]
    input: PathBuf,

    /// Root receiving one subdirectory of page images per PDF.
    #[arg(short, long, env = "PDF2RAG_IMAGES_DIR", default_value = "images")]
    output: PathBuf,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDF2RAG_DPI", default_value_t = pdf2rag::config::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2RAG_PASSWORD")]
    password: Option<String>,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "PDF2RAG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2RAG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2RAG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2RAG_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    cli::init_logging(cli.verbose, cli.quiet, show_progress);

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new("Rendering", "bytes");
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let mut builder = RenderConfig::builder()
        .input_dir(&cli.input)
        .output_dir(&cli.output)
        .dpi(cli.dpi);
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = pdfs_to_images(&config)
        .await
        .context("pdfs2images failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet && !summary.documents.is_empty() {
        eprintln!(
            "{}  {} PDFs  {} pages  {}ms  →  {}",
            green("✔"),
            summary.documents.len(),
            summary.total_pages,
            summary.duration_ms,
            bold(&cli.output.display().to_string()),
        );
    } else if !cli.quiet {
        eprintln!("{}", dim(&format!("No PDFs in {}", cli.input.display())));
    }

    Ok(())
}
