//! OpenAI Responses API client.
//!
//! Talks to `POST {base_url}/responses` directly with reqwest so that the
//! two knobs this pipeline depends on reach the wire unchanged:
//! `reasoning.effort` and `max_output_tokens`. The output-token ceiling
//! covers hidden reasoning tokens too; a low value lets a hard page spend
//! its whole budget thinking and return nothing.
//!
//! Status mapping: 429 → [`RequestError::RateLimited`] (with `Retry-After`
//! when sent), 401/403 → [`RequestError::Auth`], anything else non-2xx →
//! [`RequestError::Api`].

use crate::error::{Pdf2RagError, RequestError};
use crate::pipeline::llm::{PageReply, PageRequest, VisionClient};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Vision client for the OpenAI Responses API.
pub struct ResponsesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ResponsesClient {
    /// Build a client with an explicit key. `timeout_secs = None` leaves
    /// reqwest's default (no overall timeout).
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, Pdf2RagError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| Pdf2RagError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build a client from `OPENAI_API_KEY` (required) and `OPENAI_BASE_URL`.
    pub fn from_env(model: &str, timeout_secs: Option<u64>) -> Result<Self, Pdf2RagError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Pdf2RagError::ProviderNotConfigured {
                provider: "openai".into(),
                hint: format!("Set {API_KEY_ENV}=sk-..."),
            })?;
        let client = Self::new(api_key, model, timeout_secs)?;
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Ok(client.with_base_url(url)),
            _ => Ok(client),
        }
    }

    /// Point the client at another Responses-compatible endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

impl VisionClient for ResponsesClient {
    fn describe(&self) -> String {
        format!("openai/{}", self.model)
    }

    async fn read_page(&self, request: &PageRequest) -> Result<PageReply, RequestError> {
        let body = ResponsesRequest::new(&self.model, request);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RequestError::Transport(format!("request timed out: {e}"))
                } else {
                    RequestError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after, &text));
        }

        let reply: ResponsesReply = response
            .json()
            .await
            .map_err(|e| RequestError::InvalidResponse(e.to_string()))?;

        if reply.status.as_deref() == Some("incomplete") {
            warn!(
                "Response incomplete ({}); text may be truncated",
                reply
                    .incomplete_details
                    .as_ref()
                    .and_then(|d| d.reason.as_deref())
                    .unwrap_or("unknown reason")
            );
        }

        let usage = reply.usage.clone().unwrap_or_default();
        let text = reply.output_text();
        debug!("Responses API returned {} chars", text.len());

        Ok(PageReply {
            text,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    reasoning: Reasoning,
    max_output_tokens: usize,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: Vec<InputContent<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent<'a> {
    InputText { text: &'a str },
    InputImage { image_url: String },
}

#[derive(Debug, Serialize)]
struct Reasoning {
    effort: &'static str,
}

impl<'a> ResponsesRequest<'a> {
    fn new(model: &'a str, request: &'a PageRequest) -> Self {
        Self {
            model,
            input: vec![InputMessage {
                role: "user",
                content: vec![
                    InputContent::InputText {
                        text: &request.prompt,
                    },
                    InputContent::InputImage {
                        image_url: request.image.data_uri(),
                    },
                ],
            }],
            reasoning: Reasoning {
                effort: request.reasoning_effort.as_str(),
            },
            max_output_tokens: request.max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    incomplete_details: Option<IncompleteDetails>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<Vec<OutputContent>>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl ResponsesReply {
    /// Concatenate every `output_text` part of every `message` item.
    fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter().flatten())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn classify_status(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> RequestError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => RequestError::RateLimited {
            retry_after_secs,
            detail,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RequestError::Auth(detail),
        other => RequestError::Api {
            status: other.as_u16(),
            detail,
        },
    }
}
