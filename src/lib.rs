//! # pdf2rag
//!
//! Turn a folder of PDFs into retrieval-ready text, one file per document,
//! using a Vision Language Model (VLM) to read each page.
//!
//! ## Why images?
//!
//! Text extraction straight from PDF (pdftotext, pdf-extract) garbles
//! multi-column layouts, tables and scanned pages. Rasterising each page and
//! letting a VLM read it like a human gives clean text in reading order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pdfs/<doc>.pdf
//!  │
//!  ├─ stage 1  pdfs2images   rasterise pages via pdfium (spawn_blocking)
//!  │           → images/<doc>/<n>.png
//!  │
//!  └─ stage 2  images2rags   page image + prompt → VLM → append section
//!              → rags/<doc>.txt   (## <doc> page <n> headers)
//! ```
//!
//! The two stages share nothing but the directory layout, so a failed
//! stage 2 can be re-run without rendering again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2rag::{images_to_rags, pdfs_to_images, AnyClient, ExtractConfig, RenderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     pdfs_to_images(&RenderConfig::default()).await?;
//!
//!     let config = ExtractConfig::default();
//!     // OpenAI Responses API, key from OPENAI_API_KEY
//!     let client = AnyClient::resolve(None, &config.model, config.api_timeout_secs)?;
//!     let summary = images_to_rags(&config, &client).await?;
//!     eprintln!("tokens: {} in / {} out",
//!         summary.total_input_tokens,
//!         summary.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfs2images` and `images2rags` binaries (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2rag = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractConfig, ExtractConfigBuilder, OutputMode, PageOrder, RateLimitPolicy, ReasoningEffort,
    RenderConfig, RenderConfigBuilder,
};
pub use convert::{images_to_rags, pdfs_to_images};
pub use error::{Pdf2RagError, RequestError};
pub use output::{DocumentReport, ExtractSummary, RenderSummary};
pub use pipeline::llm::{PageReply, PageRequest, VisionClient};
pub use pipeline::provider::{AnyClient, ProviderClient};
pub use pipeline::responses::ResponsesClient;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use prompts::PromptTemplate;
