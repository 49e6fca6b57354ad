//! Progress-callback trait for per-document and per-page pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::RenderConfigBuilder::progress_callback`] or
//! [`crate::config::ExtractConfigBuilder::progress_callback`]. Both stages
//! report through the same trait: for rasterisation a "page" is a PNG
//! written, for extraction it is a section appended.
//!
//! # Example
//!
//! ```rust
//! use pdf2rag::{ExtractConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl PipelineProgressCallback for PageCounter {
//!     fn on_page_complete(&self, _doc: &str, _page: usize, _total: usize, _len: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ExtractConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it walks documents and pages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one document are always delivered in
/// page order, even when requests run concurrently.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once, after discovery, before the first document.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document with at least one page is about to be processed.
    fn on_document_start(&self, doc: &str, total_pages: usize) {
        let _ = (doc, total_pages);
    }

    /// Called when a document is passed over (no images, already extracted).
    fn on_document_skipped(&self, doc: &str, reason: &str) {
        let _ = (doc, reason);
    }

    /// Called before a page is rendered or sent to the model.
    fn on_page_start(&self, doc: &str, page_number: usize, total_pages: usize) {
        let _ = (doc, page_number, total_pages);
    }

    /// Called after a page has been written to disk.
    ///
    /// `output_len` is the PNG size in bytes (stage 1) or the trimmed text
    /// length in bytes (stage 2).
    fn on_page_complete(&self, doc: &str, page_number: usize, total_pages: usize, output_len: usize) {
        let _ = (doc, page_number, total_pages, output_len);
    }

    /// Called after the last page of a document.
    fn on_document_complete(&self, doc: &str, pages: usize) {
        let _ = (doc, pages);
    }

    /// Called once after the run finishes without a fatal error.
    fn on_run_complete(&self, documents: usize, pages: usize) {
        let _ = (documents, pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the stage configs.
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
