//! Configuration types for both pipeline stages.
//!
//! Stage 1 is controlled by [`RenderConfig`], stage 2 by [`ExtractConfig`].
//! Both are built via builders with documented defaults that reproduce the
//! fixed relative layout (`pdfs/` → `images/` → `rags/`), so the binaries
//! work with no arguments at all.

use crate::error::Pdf2RagError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default rasterisation resolution for stage 1.
pub const DEFAULT_DPI: u32 = 200;

/// Default model identifier for stage 2.
pub const DEFAULT_MODEL: &str = "gpt-5";

/// Default output-token ceiling. Reasoning tokens count against it, so it
/// is set to the model maximum rather than to an expected page length.
pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 128_000;

// ── Stage 1 ──────────────────────────────────────────────────────────────

/// Configuration for PDF → page image rasterisation.
///
/// # Example
/// ```rust
/// use pdf2rag::RenderConfig;
///
/// let config = RenderConfig::builder()
///     .input_dir("scans")
///     .dpi(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct RenderConfig {
    /// Directory scanned for `*.pdf` files. Default: `pdfs`.
    pub input_dir: PathBuf,

    /// Root under which `<pdf_stem>/<page>.png` is written. Default: `images`.
    pub output_dir: PathBuf,

    /// Rendering DPI. Range: 72–400. Default: 200.
    ///
    /// 200 DPI keeps body text legible to the model on A4/Letter pages while
    /// a page PNG stays around 1–3 MB.
    pub dpi: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("pdfs"),
            output_dir: PathBuf::from("images"),
            dpi: DEFAULT_DPI,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("dpi", &self.dpi)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Clamped to 72–400; out-of-range values never reach `build`.
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, Pdf2RagError> {
        let c = &self.config;
        if c.input_dir == c.output_dir {
            return Err(Pdf2RagError::InvalidConfig(
                "input and output directories must differ".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Stage 2 ──────────────────────────────────────────────────────────────

/// Configuration for page image → RAG text extraction.
///
/// # Example
/// ```rust
/// use pdf2rag::{ExtractConfig, OutputMode, ReasoningEffort};
///
/// let config = ExtractConfig::builder()
///     .reasoning_effort(ReasoningEffort::High)
///     .output_mode(OutputMode::Resume)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gpt-5");
/// ```
#[derive(Clone)]
pub struct ExtractConfig {
    /// Root holding one subdirectory of page images per document. Default: `images`.
    pub images_dir: PathBuf,

    /// Directory receiving `<doc_name>.txt`. Default: `rags`.
    pub output_dir: PathBuf,

    /// Prompt template with `{doc_name}` / `{page_number}`. Default: `prompt_images2rags.txt`.
    pub prompt_path: PathBuf,

    /// Model identifier sent with every request. Default: `gpt-5`.
    pub model: String,

    /// Reasoning effort requested from the model. Default: medium.
    ///
    /// `high` is noticeably slower; raise it only when medium misreads pages.
    pub reasoning_effort: ReasoningEffort,

    /// Upper bound on output tokens per request, reasoning included. Default: 128 000.
    pub max_output_tokens: usize,

    /// Page requests in flight per document. Default: 1 (strictly sequential).
    ///
    /// Sections are always appended in page order regardless of the order in
    /// which responses arrive.
    pub concurrency: usize,

    /// What to do when the API rate-limits a request. Default: stop at once.
    pub rate_limit: RateLimitPolicy,

    /// How existing output files are treated. Default: [`OutputMode::Rebuild`].
    pub output_mode: OutputMode,

    /// How page file names are ordered. Default: [`PageOrder::Lenient`].
    pub page_order: PageOrder,

    /// Per-request timeout in seconds. Default: none.
    pub api_timeout_secs: Option<u64>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("rags"),
            prompt_path: PathBuf::from("prompt_images2rags.txt"),
            model: DEFAULT_MODEL.to_string(),
            reasoning_effort: ReasoningEffort::default(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            concurrency: 1,
            rate_limit: RateLimitPolicy::default(),
            output_mode: OutputMode::default(),
            page_order: PageOrder::default(),
            api_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractConfig")
            .field("images_dir", &self.images_dir)
            .field("output_dir", &self.output_dir)
            .field("prompt_path", &self.prompt_path)
            .field("model", &self.model)
            .field("reasoning_effort", &self.reasoning_effort)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("concurrency", &self.concurrency)
            .field("rate_limit", &self.rate_limit)
            .field("output_mode", &self.output_mode)
            .field("page_order", &self.page_order)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractConfig {
    /// Create a new builder for `ExtractConfig`.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.prompt_path = path.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.config.reasoning_effort = effort;
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.config.rate_limit = policy;
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.config.output_mode = mode;
        self
    }

    pub fn page_order(mut self, order: PageOrder) -> Self {
        self.config.page_order = order;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractConfig, Pdf2RagError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Pdf2RagError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_output_tokens == 0 {
            return Err(Pdf2RagError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(Pdf2RagError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.images_dir == c.output_dir {
            return Err(Pdf2RagError::InvalidConfig(
                "images and output directories must differ".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Reasoning budget requested from reasoning-capable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    /// Wire value for the `reasoning.effort` request field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reaction to a rate-limited request.
///
/// `max_retries = 0` stops the whole run on the first rate-limit response.
/// Otherwise the request is retried, waiting the server's `Retry-After`
/// when present and `backoff_ms * 2^(attempt-1)` when not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 1000,
        }
    }
}

impl RateLimitPolicy {
    /// Stop on the first rate-limit response.
    pub fn fail_fast() -> Self {
        Self::default()
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_ms(&self, attempt: u32, retry_after_secs: Option<u64>) -> u64 {
        match retry_after_secs {
            Some(secs) => secs.saturating_mul(1000),
            None => self
                .backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1))),
        }
    }
}

/// How a run treats output files left by a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Delete every `*.txt` in the output directory, then rebuild all documents. (default)
    #[default]
    Rebuild,
    /// Keep documents holding one section per page; rebuild the rest from page 1.
    Resume,
}

/// Policy for page file names that are not plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrder {
    /// Numeric stems first (ascending), then other stems lexically. (default)
    #[default]
    Lenient,
    /// Reject a document directory that mixes numeric and non-numeric stems.
    Strict,
}
