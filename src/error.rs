//! Error types for the pdf2rag library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`Pdf2RagError`] is **fatal**: the run stops. Returned as
//!   `Err(Pdf2RagError)` from [`crate::convert::pdfs_to_images`] and
//!   [`crate::convert::images_to_rags`]. Sections already appended to an
//!   output file stay on disk.
//!
//! * [`RequestError`] is **per request**: what a single call to a
//!   [`crate::pipeline::llm::VisionClient`] returned. Only
//!   [`RequestError::RateLimited`] is subject to the configured
//!   [`crate::config::RateLimitPolicy`]; every other variant is lifted into
//!   [`Pdf2RagError::LlmApiError`] with document and page context.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2rag library.
#[derive(Debug, Error)]
pub enum Pdf2RagError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The PDF input directory does not exist.
    #[error("Input directory not found: '{path}'")]
    InputDirNotFound { path: PathBuf },

    /// The page-image root directory does not exist.
    #[error("Images directory not found: '{path}'\nRun pdfs2images first.")]
    ImagesDirNotFound { path: PathBuf },

    /// The prompt template file does not exist.
    #[error("Prompt template not found: '{path}'")]
    PromptNotFound { path: PathBuf },

    /// The prompt template could not be parsed.
    #[error("Invalid prompt template '{path}': {detail}")]
    PromptTemplate { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for '{path}' page {page}: {detail}")]
    RasterisationFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// A rendered page could not be written as PNG.
    #[error("Failed to write page image '{path}': {detail}")]
    ImageWriteFailed { path: PathBuf, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// A page image could not be read back from disk.
    #[error("Failed to read page image '{path}': {source}")]
    ImageReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document directory mixes numeric and non-numeric page names.
    #[error("Document '{doc}' mixes numeric and non-numeric page names (e.g. '{example}')")]
    MixedPageNames { doc: String, example: String },

    /// The provider kept rate-limiting after the policy was exhausted.
    #[error("{doc} page {page}: request rate-limited by the model API\n{detail}")]
    RateLimited {
        doc: String,
        page: usize,
        detail: String,
    },

    /// The model API returned an error that is not subject to retry.
    #[error("{doc} page {page}: model API error: {message}")]
    LlmApiError {
        doc: String,
        page: usize,
        message: String,
    },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, truncate, or append to an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing or creation failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or\n\
set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2RagError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Pdf2RagError::Io {
            path: path.into(),
            source,
        }
    }
}

/// The outcome of a single failed model request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    /// HTTP 429 or a provider's rate-limit error.
    #[error("rate limit exceeded: {detail}")]
    RateLimited {
        retry_after_secs: Option<u64>,
        detail: String,
    },

    /// 401/403.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Any other non-success response from the API.
    #[error("API returned {status}: {detail}")]
    Api { status: u16, detail: String },

    /// The request never produced a response (DNS, TLS, timeout, …).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response arrived but could not be interpreted.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// A provider failure with no HTTP status attached (token limit,
    /// unknown model, bad request, …).
    #[error("{0}")]
    Provider(String),
}

impl RequestError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RequestError::RateLimited { .. })
    }
}
