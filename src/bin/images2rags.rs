//! Stage 2 CLI: transcribe `images/<doc>/` into `rags/<doc>.txt`.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractConfig`, picks the vision backend and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2rag::cli::{self, bold, cyan, dim, green, CliProgressCallback};
use pdf2rag::config::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL};
use pdf2rag::{
    images_to_rags, AnyClient, ExtractConfig, OutputMode, PageOrder, PipelineProgressCallback,
    ProgressCallback, RateLimitPolicy, ReasoningEffort,
};
use std::path::PathBuf;
use std::sync::Arc;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default layout: images/<doc>/ -> rags/<doc>.txt, gpt-5, medium effort
  images2rags

  # Four pages in flight per document (output order is unchanged)
  images2rags --concurrency 4

  # Keep finished documents and redo unfinished ones from page 1
  images2rags --mode resume

  # Wait out rate limits instead of stopping
  images2rags --rate-limit-retries 5 --retry-backoff-ms 2000

  # Another provider through edgequake-llm
  images2rags --provider anthropic --model claude-sonnet-4-20250514

PROMPT TEMPLATE:
  Read once from --prompt (default prompt_images2rags.txt). Placeholders:
  {doc_name}, {page_number}. Write {{ and }} for literal braces.

OUTPUT:
  One file per document, one section per page:
    ## <doc_name> page <n>
    <text>
    <blank line>

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (default backend)
  OPENAI_BASE_URL         Responses API root (default https://api.openai.com/v1)
  ANTHROPIC_API_KEY       Anthropic API key (--provider anthropic)
  GEMINI_API_KEY          Google Gemini API key (--provider gemini)
  PDF2RAG_*               Every flag, e.g. PDF2RAG_MODEL, PDF2RAG_CONCURRENCY
"#;

/// Transcribe page images into one RAG text file per document.
#[derive(Parser, Debug)]
#[command(
    name = "images2rags",
    version,
    about = "Transcribe page images into one RAG text file per document using a vision LLM",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Root holding one subdirectory of page images per document.
    #[arg(short, long, env = "PDF2RAG_IMAGES_DIR", default_value = "images")]
    input: PathBuf,

    /// Directory receiving <doc_name>.txt.
    #[arg(short, long, env = "PDF2RAG_RAGS_DIR", default_value = "rags")]
    output: PathBuf,

    /// Prompt template file.
    #[arg(long, env = "PDF2RAG_PROMPT", default_value = "prompt_images2rags.txt")]
    prompt: PathBuf,

    /// Vision backend: openai (Responses API, default) or any edgequake-llm
    /// provider name (anthropic, gemini, mistral, ollama, auto).
    #[arg(long, env = "PDF2RAG_PROVIDER")]
    provider: Option<String>,

    /// Model ID.
    #[arg(long, env = "PDF2RAG_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Reasoning effort (Responses API only).
    #[arg(long, env = "PDF2RAG_REASONING_EFFORT", value_enum, default_value = "medium")]
    reasoning_effort: EffortArg,

    /// Max output tokens per page, reasoning included.
    #[arg(long, env = "PDF2RAG_MAX_OUTPUT_TOKENS", default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    max_output_tokens: usize,

    /// Page requests in flight per document.
    #[arg(short, long, env = "PDF2RAG_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Retries after a rate-limit response before giving up (0 = stop at once).
    #[arg(long, env = "PDF2RAG_RATE_LIMIT_RETRIES", default_value_t = 0)]
    rate_limit_retries: u32,

    /// Base backoff between rate-limit retries, doubled each attempt.
    #[arg(long, env = "PDF2RAG_RETRY_BACKOFF_MS", default_value_t = 1000)]
    retry_backoff_ms: u64,

    /// rebuild: wipe *.txt first; resume: skip documents with every page written.
    #[arg(long, env = "PDF2RAG_MODE", value_enum, default_value = "rebuild")]
    mode: ModeArg,

    /// Fail on directories mixing numeric and non-numeric page names.
    #[arg(long, env = "PDF2RAG_STRICT_PAGE_NAMES")]
    strict_page_names: bool,

    /// Per-request timeout in seconds (default: none).
    #[arg(long, env = "PDF2RAG_API_TIMEOUT")]
    api_timeout: Option<u64>,

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

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EffortArg {
    Minimal,
    Low,
    Medium,
    High,
}

impl From<EffortArg> for ReasoningEffort {
    fn from(v: EffortArg) -> Self {
        match v {
            EffortArg::Minimal => ReasoningEffort::Minimal,
            EffortArg::Low => ReasoningEffort::Low,
            EffortArg::Medium => ReasoningEffort::Medium,
            EffortArg::High => ReasoningEffort::High,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Rebuild,
    Resume,
}

impl From<ModeArg> for OutputMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Rebuild => OutputMode::Rebuild,
            ModeArg::Resume => OutputMode::Resume,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    cli::init_logging(cli.verbose, cli.quiet, show_progress);

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new("Extracting", "chars");
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Resolve backend ──────────────────────────────────────────────────
    let client = AnyClient::resolve(cli.provider.as_deref(), &config.model, config.api_timeout_secs)
        .context("Failed to initialise the vision model client")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = images_to_rags(&config, &client)
        .await
        .context("images2rags failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} documents  {} pages  {}ms  →  {}",
            if summary.skipped_documents() == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            summary.processed_documents(),
            summary.total_pages,
            summary.duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if summary.skipped_documents() > 0 {
            eprintln!("   {} documents skipped", summary.skipped_documents());
        }
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&summary.total_input_tokens.to_string()),
            dim(&summary.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractConfig> {
    let page_order = if cli.strict_page_names {
        PageOrder::Strict
    } else {
        PageOrder::Lenient
    };

    let mut builder = ExtractConfig::builder()
        .images_dir(&cli.input)
        .output_dir(&cli.output)
        .prompt_path(&cli.prompt)
        .model(&cli.model)
        .reasoning_effort(cli.reasoning_effort.into())
        .max_output_tokens(cli.max_output_tokens)
        .concurrency(cli.concurrency)
        .rate_limit(RateLimitPolicy {
            max_retries: cli.rate_limit_retries,
            backoff_ms: cli.retry_backoff_ms,
        })
        .output_mode(cli.mode.into())
        .page_order(page_order);

    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
