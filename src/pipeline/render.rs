//! PDF rasterisation: render every page to `<output>/<stem>/<n>.png` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! The whole stage 1 loop therefore runs on one blocking-pool thread; PDFs
//! are rendered strictly one after another.
//!
//! ## Resolution
//!
//! PDF geometry is in points (1/72 inch). A page `w × h` points wide renders
//! to `w·dpi/72 × h·dpi/72` pixels, so an A4 page at 200 DPI is ~1654 × 2339.

use crate::error::Pdf2RagError;
use crate::output::DocumentReport;
use crate::pipeline::layout;
use crate::progress::ProgressCallback;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to a pdfium library.
///
/// Resolution order: `PDFIUM_LIB_PATH`, the platform library in the working
/// directory, then the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2RagError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !path.is_empty() {
            debug!("Binding pdfium from {}={}", PDFIUM_LIB_PATH_ENV, path);
            return Pdfium::bind_to_library(&path)
                .map(Pdfium::new)
                .map_err(|e| Pdf2RagError::PdfiumBindingFailed(format!("{path}: {e}")));
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path(&PathBuf::from("."));
    Pdfium::bind_to_library(&local)
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| Pdf2RagError::PdfiumBindingFailed(e.to_string()))
}

/// Rasterise every PDF in `pdfs` into `output_root`, one blocking task for the run.
pub async fn render_documents(
    pdfs: Vec<PathBuf>,
    output_root: PathBuf,
    dpi: u32,
    password: Option<String>,
    progress: Option<ProgressCallback>,
) -> Result<Vec<DocumentReport>, Pdf2RagError> {
    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let mut reports = Vec::with_capacity(pdfs.len());
        for pdf in &pdfs {
            let report = render_document_blocking(
                &pdfium,
                pdf,
                &output_root,
                dpi,
                password.as_deref(),
                progress.as_ref(),
            )?;
            reports.push(report);
        }
        Ok(reports)
    })
    .await
    .map_err(|e| Pdf2RagError::Internal(format!("Render task panicked: {}", e)))?
}

/// Render one PDF. Pre-existing PNGs in the target directory are overwritten
/// by name; extra pages from an earlier, longer version are left in place.
fn render_document_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    output_root: &Path,
    dpi: u32,
    password: Option<&str>,
    progress: Option<&ProgressCallback>,
) -> Result<DocumentReport, Pdf2RagError> {
    let name = layout::document_name(pdf_path);
    info!(
        "Processing {} ...",
        pdf_path.file_name().unwrap_or_default().to_string_lossy()
    );

    let doc_dir = output_root.join(&name);
    std::fs::create_dir_all(&doc_dir).map_err(|e| Pdf2RagError::io(&doc_dir, e))?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    debug!("{}: {} pages", name, total_pages);
    if let Some(cb) = progress {
        cb.on_document_start(&name, total_pages);
    }

    let scale = dpi as f32 / 72.0;

    for (index, page) in pages.iter().enumerate() {
        let page_number = index + 1;
        if let Some(cb) = progress {
            cb.on_page_start(&name, page_number, total_pages);
        }

        let width = (page.width().value * scale).round() as i32;
        let height = (page.height().value * scale).round() as i32;
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Pdf2RagError::RasterisationFailed {
                path: pdf_path.to_path_buf(),
                page: page_number,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        let out_path = page_image_path(output_root, &name, page_number);
        image
            .save_with_format(&out_path, ImageFormat::Png)
            .map_err(|e| Pdf2RagError::ImageWriteFailed {
                path: out_path.clone(),
                detail: e.to_string(),
            })?;

        let written = std::fs::metadata(&out_path).map(|m| m.len() as usize).unwrap_or(0);
        debug!(
            "Rendered page {} → {}x{} px, {}",
            page_number,
            image.width(),
            image.height(),
            out_path.display()
        );
        if let Some(cb) = progress {
            cb.on_page_complete(&name, page_number, total_pages, written);
        }
    }

    info!("  -> {} pages saved to {}", total_pages, doc_dir.display());
    if let Some(cb) = progress {
        cb.on_document_complete(&name, total_pages);
    }

    Ok(DocumentReport {
        name,
        path: doc_dir,
        pages: total_pages,
        skipped: None,
    })
}

/// `<root>/<doc>/<page>.png`, page numbers unpadded and 1-based.
pub fn page_image_path(output_root: &Path, doc_name: &str, page_number: usize) -> PathBuf {
    output_root.join(doc_name).join(format!("{page_number}.png"))
}

fn classify_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> Pdf2RagError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            Pdf2RagError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2RagError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2RagError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}
