//! Stage entry points.
//!
//! * [`pdfs_to_images`]: stage 1, `pdfs/*.pdf` → `images/<doc>/<n>.png`.
//! * [`images_to_rags`]: stage 2, `images/<doc>/` → `rags/<doc>.txt`.
//!
//! Both return a summary on success and stop at the first fatal error.
//! Stage 2 writes each section as soon as its page completes, so whatever
//! was appended before a failure stays on disk.

use crate::config::{ExtractConfig, OutputMode, RenderConfig};
use crate::error::{Pdf2RagError, RequestError};
use crate::output::{DocumentReport, ExtractSummary, RenderSummary};
use crate::pipeline::llm::{self, PageRequest, VisionClient};
use crate::pipeline::{encode, layout, render, sink};
use crate::prompts::PromptTemplate;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// Rasterise every PDF in `config.input_dir` to page PNGs.
///
/// # Errors
/// - [`Pdf2RagError::InputDirNotFound`] before anything is created
/// - any PDF that fails to open or render ends the run
pub async fn pdfs_to_images(config: &RenderConfig) -> Result<RenderSummary, Pdf2RagError> {
    let start = Instant::now();

    // ── Step 1: Validate input ───────────────────────────────────────────
    if !config.input_dir.is_dir() {
        return Err(Pdf2RagError::InputDirNotFound {
            path: config.input_dir.clone(),
        });
    }

    // ── Step 2: Prepare output root ──────────────────────────────────────
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| Pdf2RagError::io(&config.output_dir, e))?;

    // ── Step 3: Discover PDFs ────────────────────────────────────────────
    let pdfs = layout::discover_pdfs(&config.input_dir)?;
    if pdfs.is_empty() {
        info!("No PDF files found in {}", config.input_dir.display());
        return Ok(RenderSummary {
            duration_ms: start.elapsed().as_millis() as u64,
            ..Default::default()
        });
    }
    info!("Found {} PDF files", pdfs.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(pdfs.len());
    }

    // ── Step 4: Rasterise ────────────────────────────────────────────────
    let documents = render::render_documents(
        pdfs,
        config.output_dir.clone(),
        config.dpi,
        config.password.clone(),
        config.progress_callback.clone(),
    )
    .await?;

    let total_pages = documents.iter().map(|d| d.pages).sum();
    let summary = RenderSummary {
        documents,
        total_pages,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Rendered {} pages from {} PDFs in {}ms",
        summary.total_pages,
        summary.documents.len(),
        summary.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(summary.documents.len(), summary.total_pages);
    }

    Ok(summary)
}

/// Extract text from every document directory under `config.images_dir`.
///
/// Documents run one after another; within a document up to
/// `config.concurrency` page requests are in flight and sections are
/// appended in page order.
///
/// # Errors
/// - [`Pdf2RagError::PromptNotFound`] / [`Pdf2RagError::PromptTemplate`]
///   before any directory is touched
/// - [`Pdf2RagError::ImagesDirNotFound`]
/// - [`Pdf2RagError::RateLimited`] once the rate-limit policy is exhausted
/// - [`Pdf2RagError::LlmApiError`] for any other request failure
pub async fn images_to_rags<C: VisionClient>(
    config: &ExtractConfig,
    client: &C,
) -> Result<ExtractSummary, Pdf2RagError> {
    let start = Instant::now();

    // ── Step 1: Load prompt ──────────────────────────────────────────────
    let prompt = PromptTemplate::load(&config.prompt_path)?;

    // ── Step 2: Validate input ───────────────────────────────────────────
    if !config.images_dir.is_dir() {
        return Err(Pdf2RagError::ImagesDirNotFound {
            path: config.images_dir.clone(),
        });
    }

    // ── Step 3: Prepare output directory ─────────────────────────────────
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| Pdf2RagError::io(&config.output_dir, e))?;

    let cleared_files = match config.output_mode {
        OutputMode::Rebuild => sink::clear_outputs(&config.output_dir).await?,
        OutputMode::Resume => 0,
    };
    if cleared_files > 0 {
        info!(
            "Removed {} existing output files from {}",
            cleared_files,
            config.output_dir.display()
        );
    }

    let mut summary = ExtractSummary {
        cleared_files,
        ..Default::default()
    };

    // ── Step 4: Discover documents ───────────────────────────────────────
    let doc_dirs = layout::document_dirs(&config.images_dir)?;
    if doc_dirs.is_empty() {
        info!(
            "No document directories found in {}",
            config.images_dir.display()
        );
        summary.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(summary);
    }
    info!(
        "Extracting {} documents with {}",
        doc_dirs.len(),
        client.describe()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(doc_dirs.len());
    }

    // ── Step 5: Extract, one document at a time ──────────────────────────
    for doc_dir in &doc_dirs {
        let report = extract_document(doc_dir, config, client, &prompt, &mut summary).await?;
        summary.total_pages += report.pages;
        summary.documents.push(report);
    }

    summary.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {} documents, {} pages, {} input / {} output tokens, {}ms",
        summary.processed_documents(),
        summary.total_pages,
        summary.total_input_tokens,
        summary.total_output_tokens,
        summary.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(summary.processed_documents(), summary.total_pages);
    }

    Ok(summary)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run every page of one document and append its sections.
///
/// Token counts and retries are accumulated into `totals` as pages land so
/// that they stay correct up to the page that failed.
async fn extract_document<C: VisionClient>(
    doc_dir: &Path,
    config: &ExtractConfig,
    client: &C,
    prompt: &PromptTemplate,
    totals: &mut ExtractSummary,
) -> Result<DocumentReport, Pdf2RagError> {
    let name = layout::document_name(doc_dir);
    let out_path = sink::output_path(&config.output_dir, &name);
    let progress = config.progress_callback.as_ref();

    let pages = layout::page_images(doc_dir, config.page_order)?;

    match config.output_mode {
        OutputMode::Rebuild => sink::touch(&out_path).await?,
        OutputMode::Resume => {
            let done = sink::completed_sections(&out_path, &name).await;
            if !pages.is_empty() && done == pages.len() {
                info!("Skipping {}: already extracted to {}", name, out_path.display());
                return Ok(skipped(name, out_path, "already extracted", progress));
            }
            if done > 0 {
                info!(
                    "Re-extracting {}: {} of {} sections on disk",
                    name,
                    done,
                    pages.len()
                );
            }
            sink::truncate(&out_path).await?;
        }
    }

    if pages.is_empty() {
        info!("Skipping {}: no page images in {}", name, doc_dir.display());
        return Ok(skipped(name, out_path, "no page images", progress));
    }

    let total_pages = pages.len();
    info!("Processing {} ({} pages)", name, total_pages);
    if let Some(cb) = progress {
        cb.on_document_start(&name, total_pages);
    }

    let doc_name = name.as_str();
    {
        let requests = stream::iter(pages.into_iter().enumerate().map(|(index, path)| {
            let page_number = index + 1;
            if let Some(cb) = progress {
                cb.on_page_start(doc_name, page_number, total_pages);
            }
            async move {
                info!(
                    "  page {}: {}",
                    page_number,
                    path.file_name().unwrap_or_default().to_string_lossy()
                );
                let image = encode::load_page_image(&path).await?;
                let request = PageRequest {
                    prompt: prompt.render(doc_name, page_number),
                    image,
                    reasoning_effort: config.reasoning_effort,
                    max_output_tokens: config.max_output_tokens,
                };
                llm::process_page(client, &request, &config.rate_limit, doc_name, page_number)
                    .await
                    .map(|outcome| (page_number, outcome))
                    .map_err(|e| lift_request_error(e, doc_name, page_number))
            }
        }))
        .buffered(config.concurrency.max(1));
        let mut requests = std::pin::pin!(requests);

        while let Some(result) = requests.next().await {
            let (page_number, outcome) = result?;
            sink::append_section(&out_path, doc_name, page_number, &outcome.reply.text).await?;

            totals.total_input_tokens += outcome.reply.input_tokens;
            totals.total_output_tokens += outcome.reply.output_tokens;
            totals.rate_limit_retries += outcome.retries;

            if let Some(cb) = progress {
                cb.on_page_complete(
                    doc_name,
                    page_number,
                    total_pages,
                    outcome.reply.text.trim().len(),
                );
            }
        }

        info!("  -> {} pages appended to {}", total_pages, out_path.display());
        if let Some(cb) = progress {
            cb.on_document_complete(doc_name, total_pages);
        }
    }

    Ok(DocumentReport {
        name,
        path: out_path,
        pages: total_pages,
        skipped: None,
    })
}

fn skipped(
    name: String,
    path: std::path::PathBuf,
    reason: &str,
    progress: Option<&crate::progress::ProgressCallback>,
) -> DocumentReport {
    if let Some(cb) = progress {
        cb.on_document_skipped(&name, reason);
    }
    DocumentReport {
        name,
        path,
        pages: 0,
        skipped: Some(reason.to_string()),
    }
}

/// Attach document and page to a request failure.
fn lift_request_error(e: RequestError, doc: &str, page: usize) -> Pdf2RagError {
    match e {
        RequestError::RateLimited { detail, .. } => {
            error!("Rate limited on {} page {}: {}", doc, page, detail);
            Pdf2RagError::RateLimited {
                doc: doc.to_string(),
                page,
                detail,
            }
        }
        other => Pdf2RagError::LlmApiError {
            doc: doc.to_string(),
            page,
            message: other.to_string(),
        },
    }
}
