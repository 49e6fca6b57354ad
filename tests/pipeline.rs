//! Integration tests for both stages.
//!
//! Stage 2 runs against a scripted in-process `VisionClient`, so no API key
//! or network access is needed. Stage 1 tests only cover the paths that
//! stop before pdfium is bound.
//!
//! Run with:
//!   cargo test --test pipeline

use pdf2rag::{
    images_to_rags, pdfs_to_images, ExtractConfig, OutputMode, PageOrder, PageReply, PageRequest,
    Pdf2RagError, PipelineProgressCallback, RateLimitPolicy, RenderConfig, RequestError,
    VisionClient,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

const PROMPT: &str = "Read {doc_name} page {page_number}";

/// Answers every page with a deterministic text built from the prompt.
#[derive(Default)]
struct ScriptedClient {
    /// Prompts that get a 429 instead of an answer.
    rate_limited: HashSet<String>,
    /// Sleep longer on early pages so later ones finish first.
    reverse_latency: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    data_uris: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn rate_limiting(prompts: &[&str]) -> Self {
        Self {
            rate_limited: prompts.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VisionClient for ScriptedClient {
    fn describe(&self) -> String {
        "scripted/test".into()
    }

    async fn read_page(&self, request: &PageRequest) -> Result<PageReply, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.data_uris.lock().unwrap().push(request.image.data_uri());

        if self.reverse_latency {
            let page: u64 = request
                .prompt
                .rsplit(' ')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(1);
            tokio::time::sleep(Duration::from_millis(60u64.saturating_sub(page * 10))).await;
        }

        if self.rate_limited.contains(&request.prompt) {
            return Err(RequestError::RateLimited {
                retry_after_secs: None,
                detail: "Rate limit reached".into(),
            });
        }

        Ok(PageReply {
            text: format!("\n  text of {}  \n", request.prompt),
            input_tokens: 10,
            output_tokens: 5,
        })
    }
}

struct Workspace {
    _tmp: tempfile::TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        fs::write(root.join("prompt_images2rags.txt"), PROMPT).unwrap();
        fs::create_dir(root.join("images")).unwrap();
        Self { _tmp: tmp, root }
    }

    /// Create `images/<doc>/<file>` for each file name.
    fn pages(&self, doc: &str, files: &[&str]) -> &Self {
        let dir = self.root.join("images").join(doc);
        fs::create_dir_all(&dir).unwrap();
        for f in files {
            fs::write(dir.join(f), f.as_bytes()).unwrap();
        }
        self
    }

    fn config(&self) -> pdf2rag::ExtractConfigBuilder {
        ExtractConfig::builder()
            .images_dir(self.root.join("images"))
            .output_dir(self.root.join("rags"))
            .prompt_path(self.root.join("prompt_images2rags.txt"))
    }

    fn rag(&self, doc: &str) -> String {
        fs::read_to_string(self.rags().join(format!("{doc}.txt"))).unwrap()
    }

    fn rags(&self) -> PathBuf {
        self.root.join("rags")
    }
}

fn expected(doc: &str, pages: usize) -> String {
    (1..=pages)
        .map(|n| format!("## {doc} page {n}\ntext of Read {doc} page {n}\n\n"))
        .collect()
}

// ── Stage 2 ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_one_section_per_page_in_order() {
    let ws = Workspace::new();
    ws.pages("manual", &["1.png", "2.png", "3.png"]);
    let client = ScriptedClient::default();

    let summary = images_to_rags(&ws.config().build().unwrap(), &client)
        .await
        .unwrap();

    assert_eq!(ws.rag("manual"), expected("manual", 3));
    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.processed_documents(), 1);
    assert_eq!(summary.total_input_tokens, 30);
    assert_eq!(summary.total_output_tokens, 15);
}

#[tokio::test]
async fn test_numeric_page_order() {
    let ws = Workspace::new();
    ws.pages("doc", &["2.png", "10.png", "1.png"]);
    let client = ScriptedClient::default();

    images_to_rags(&ws.config().build().unwrap(), &client)
        .await
        .unwrap();

    // Page numbers are ordinal, files go 1, 2, 10.
    let uris = client.data_uris.lock().unwrap().clone();
    let decoded: Vec<&str> = vec!["1.png", "2.png", "10.png"];
    let expected_uris: Vec<String> = decoded
        .iter()
        .map(|f| {
            use base64::Engine as _;
            format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(f.as_bytes())
            )
        })
        .collect();
    assert_eq!(uris, expected_uris);
    assert_eq!(ws.rag("doc"), expected("doc", 3));
}

#[tokio::test]
async fn test_two_runs_are_byte_identical() {
    let ws = Workspace::new();
    ws.pages("a", &["1.png", "2.jpg"]).pages("b", &["1.webp"]);
    let config = ws.config().build().unwrap();

    images_to_rags(&config, &ScriptedClient::default()).await.unwrap();
    let first = (ws.rag("a"), ws.rag("b"));
    images_to_rags(&config, &ScriptedClient::default()).await.unwrap();
    let second = (ws.rag("a"), ws.rag("b"));

    assert_eq!(first, second);
    assert_eq!(first.0, expected("a", 2));
}

#[tokio::test]
async fn test_document_without_images_gets_empty_file() {
    let ws = Workspace::new();
    ws.pages("empty", &["notes.txt"]).pages("full", &["1.png"]);
    let client = ScriptedClient::default();

    let summary = images_to_rags(&ws.config().build().unwrap(), &client)
        .await
        .unwrap();

    assert_eq!(ws.rag("empty"), "");
    assert_eq!(ws.rag("full"), expected("full", 1));
    assert_eq!(summary.skipped_documents(), 1);
    assert_eq!(summary.documents[0].skipped.as_deref(), Some("no page images"));
}

#[tokio::test]
async fn test_rebuild_removes_stale_outputs() {
    let ws = Workspace::new();
    ws.pages("a", &["1.png"]);
    fs::create_dir_all(ws.rags()).unwrap();
    fs::write(ws.rags().join("old.txt"), "stale").unwrap();
    fs::write(ws.rags().join("a.txt"), "stale").unwrap();

    let summary = images_to_rags(&ws.config().build().unwrap(), &ScriptedClient::default())
        .await
        .unwrap();

    assert_eq!(summary.cleared_files, 2);
    assert!(!ws.rags().join("old.txt").exists());
    assert_eq!(ws.rag("a"), expected("a", 1));
}

#[tokio::test]
async fn test_rate_limit_stops_run_and_keeps_written_sections() {
    let ws = Workspace::new();
    ws.pages("A", &["1.png", "2.png"])
        .pages("B", &["1.png", "2.png", "3.png"])
        .pages("C", &["1.png"]);
    let client = ScriptedClient::rate_limiting(&["Read B page 2"]);

    let err = images_to_rags(&ws.config().build().unwrap(), &client)
        .await
        .unwrap_err();

    match err {
        Pdf2RagError::RateLimited { ref doc, page, .. } => {
            assert_eq!(doc, "B");
            assert_eq!(page, 2);
        }
        ref other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("B page 2"));
    assert_eq!(ws.rag("A"), expected("A", 2));
    assert_eq!(ws.rag("B"), expected("B", 1));
    assert!(!ws.rags().join("C.txt").exists());
    assert_eq!(client.calls(), 4);
}

#[tokio::test]
async fn test_rate_limit_retries_within_policy() {
    struct Flaky(AtomicUsize);

    impl VisionClient for Flaky {
        fn describe(&self) -> String {
            "flaky".into()
        }

        async fn read_page(&self, request: &PageRequest) -> Result<PageReply, RequestError> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(RequestError::RateLimited {
                    retry_after_secs: None,
                    detail: "429".into(),
                });
            }
            Ok(PageReply {
                text: format!("text of {}", request.prompt),
                ..Default::default()
            })
        }
    }

    let ws = Workspace::new();
    ws.pages("doc", &["1.png", "2.png"]);
    let config = ws
        .config()
        .rate_limit(RateLimitPolicy {
            max_retries: 2,
            backoff_ms: 1,
        })
        .build()
        .unwrap();

    let summary = images_to_rags(&config, &Flaky(AtomicUsize::new(0)))
        .await
        .unwrap();

    assert_eq!(summary.rate_limit_retries, 1);
    assert_eq!(ws.rag("doc"), expected("doc", 2));
}

#[tokio::test]
async fn test_other_api_errors_end_the_run() {
    struct Broken;

    impl VisionClient for Broken {
        fn describe(&self) -> String {
            "broken".into()
        }

        async fn read_page(&self, _request: &PageRequest) -> Result<PageReply, RequestError> {
            Err(RequestError::Api {
                status: 500,
                detail: "internal".into(),
            })
        }
    }

    let ws = Workspace::new();
    ws.pages("doc", &["1.png"]);
    let err = images_to_rags(&ws.config().build().unwrap(), &Broken)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2RagError::LlmApiError { page: 1, .. }));
    assert_eq!(ws.rag("doc"), "");
}

#[tokio::test]
async fn test_concurrency_keeps_page_order() {
    let ws = Workspace::new();
    ws.pages("doc", &["1.png", "2.png", "3.png", "4.png", "5.png"]);
    let client = ScriptedClient {
        reverse_latency: true,
        ..Default::default()
    };
    let config = ws.config().concurrency(4).build().unwrap();

    images_to_rags(&config, &client).await.unwrap();

    assert_eq!(ws.rag("doc"), expected("doc", 5));
    assert_eq!(client.calls(), 5);
}

#[tokio::test]
async fn test_resume_skips_finished_documents() {
    let ws = Workspace::new();
    ws.pages("done", &["1.png"]).pages("partial", &["1.png", "2.png"]);
    fs::create_dir_all(ws.rags()).unwrap();
    let finished = "## done page 1\nkept as is\n\n";
    fs::write(ws.rags().join("done.txt"), finished).unwrap();
    fs::write(ws.rags().join("partial.txt"), "").unwrap();
    fs::write(ws.rags().join("unrelated.txt"), "kept too").unwrap();

    let client = ScriptedClient::default();
    let config = ws.config().output_mode(OutputMode::Resume).build().unwrap();
    let summary = images_to_rags(&config, &client).await.unwrap();

    assert_eq!(ws.rag("done"), finished);
    assert_eq!(ws.rag("partial"), expected("partial", 2));
    assert_eq!(ws.rag("unrelated"), "kept too");
    assert_eq!(summary.cleared_files, 0);
    assert_eq!(summary.documents[0].skipped.as_deref(), Some("already extracted"));
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_resume_redoes_document_cut_short_by_rate_limit() {
    let ws = Workspace::new();
    ws.pages("A", &["1.png", "2.png"])
        .pages("B", &["1.png", "2.png", "3.png"]);

    let limited = ScriptedClient::rate_limiting(&["Read B page 2"]);
    let err = images_to_rags(&ws.config().build().unwrap(), &limited)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2RagError::RateLimited { page: 2, .. }));
    assert_eq!(ws.rag("B"), expected("B", 1));

    let healthy = ScriptedClient::default();
    let config = ws.config().output_mode(OutputMode::Resume).build().unwrap();
    let summary = images_to_rags(&config, &healthy).await.unwrap();

    assert_eq!(ws.rag("A"), expected("A", 2));
    assert_eq!(ws.rag("B"), expected("B", 3));
    assert_eq!(summary.documents[0].skipped.as_deref(), Some("already extracted"));
    assert_eq!(summary.documents[1].skipped, None);
    assert_eq!(summary.documents[1].pages, 3);
    assert_eq!(healthy.calls(), 3);
}

#[tokio::test]
async fn test_strict_page_names_rejects_mixed_directory() {
    let ws = Workspace::new();
    ws.pages("doc", &["1.png", "cover.png"]);
    let config = ws.config().page_order(PageOrder::Strict).build().unwrap();

    let err = images_to_rags(&config, &ScriptedClient::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2RagError::MixedPageNames { .. }));
}

#[tokio::test]
async fn test_data_uri_mime_follows_extension() {
    let ws = Workspace::new();
    ws.pages("doc", &["1.PNG", "2.JPEG"]);
    let client = ScriptedClient::default();

    images_to_rags(&ws.config().build().unwrap(), &client)
        .await
        .unwrap();

    let uris = client.data_uris.lock().unwrap().clone();
    assert!(uris[0].starts_with("data:image/png;base64,"));
    assert!(uris[1].starts_with("data:image/jpeg;base64,"));
    assert_eq!(
        pdf2rag::pipeline::encode::guess_mime(Path::new("page.xyz")),
        "image/png"
    );
}

#[tokio::test]
async fn test_prompt_receives_document_and_page() {
    let ws = Workspace::new();
    ws.pages("annual.report", &["1.png", "2.png"]);
    let client = ScriptedClient::default();

    images_to_rags(&ws.config().build().unwrap(), &client)
        .await
        .unwrap();

    assert_eq!(
        *client.prompts.lock().unwrap(),
        vec!["Read annual.report page 1", "Read annual.report page 2"]
    );
}

#[tokio::test]
async fn test_missing_images_dir_is_fatal() {
    let ws = Workspace::new();
    let config = ws
        .config()
        .images_dir(ws.root.join("nowhere"))
        .build()
        .unwrap();

    let err = images_to_rags(&config, &ScriptedClient::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2RagError::ImagesDirNotFound { .. }));
    assert!(!ws.rags().exists());
}

#[tokio::test]
async fn test_missing_prompt_is_fatal_before_any_work() {
    let ws = Workspace::new();
    ws.pages("doc", &["1.png"]);
    let config = ws
        .config()
        .prompt_path(ws.root.join("missing.txt"))
        .build()
        .unwrap();

    let client = ScriptedClient::default();
    let err = images_to_rags(&config, &client).await.unwrap_err();
    assert!(matches!(err, Pdf2RagError::PromptNotFound { .. }));
    assert!(!ws.rags().exists());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_empty_images_root_is_not_an_error() {
    let ws = Workspace::new();
    let summary = images_to_rags(&ws.config().build().unwrap(), &ScriptedClient::default())
        .await
        .unwrap();
    assert!(summary.documents.is_empty());
}

#[tokio::test]
async fn test_progress_events_arrive_in_page_order() {
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl PipelineProgressCallback for Recorder {
        fn on_document_skipped(&self, doc: &str, _reason: &str) {
            self.0.lock().unwrap().push(format!("skip {doc}"));
        }
        fn on_page_complete(&self, doc: &str, page: usize, _total: usize, _len: usize) {
            self.0.lock().unwrap().push(format!("{doc}:{page}"));
        }
        fn on_run_complete(&self, documents: usize, pages: usize) {
            self.0.lock().unwrap().push(format!("done {documents}/{pages}"));
        }
    }

    let ws = Workspace::new();
    ws.pages("a", &["1.png", "2.png", "3.png"]).pages("b", &[]);
    let recorder = Arc::new(Recorder::default());
    let config = ws
        .config()
        .concurrency(3)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let client = ScriptedClient {
        reverse_latency: true,
        ..Default::default()
    };

    images_to_rags(&config, &client).await.unwrap();

    assert_eq!(
        *recorder.0.lock().unwrap(),
        vec!["a:1", "a:2", "a:3", "skip b", "done 1/3"]
    );
}

// ── Stage 1 ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_pdfs_dir_fails_before_creating_images() {
    let tmp = tempfile::tempdir().unwrap();
    let config = RenderConfig::builder()
        .input_dir(tmp.path().join("pdfs"))
        .output_dir(tmp.path().join("images"))
        .build()
        .unwrap();

    let err = pdfs_to_images(&config).await.unwrap_err();
    assert!(matches!(err, Pdf2RagError::InputDirNotFound { .. }));
    assert!(!tmp.path().join("images").exists());
}

#[tokio::test]
async fn test_empty_pdfs_dir_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir(tmp.path().join("pdfs")).unwrap();
    fs::write(tmp.path().join("pdfs/readme.txt"), "not a pdf").unwrap();
    let config = RenderConfig::builder()
        .input_dir(tmp.path().join("pdfs"))
        .output_dir(tmp.path().join("images"))
        .build()
        .unwrap();

    let summary = pdfs_to_images(&config).await.unwrap();
    assert!(summary.documents.is_empty());
    assert_eq!(summary.total_pages, 0);
}
