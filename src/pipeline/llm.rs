//! VLM interaction: the client seam and the per-page request loop.
//!
//! [`VisionClient`] is the only point where the pipeline touches the
//! network. Two implementations ship with the crate:
//!
//! * [`crate::pipeline::responses::ResponsesClient`]: OpenAI Responses API
//!   over reqwest; honours reasoning effort and detects HTTP 429 exactly.
//! * [`crate::pipeline::provider::ProviderClient`]: any edgequake-llm
//!   provider (Anthropic, Gemini, Mistral, Ollama, …).
//!
//! Tests drive the pipeline with an in-process client.
//!
//! ## Rate limits
//!
//! A rate-limited request is retried only as far as
//! [`RateLimitPolicy`](crate::config::RateLimitPolicy) allows; the default
//! allows nothing, so the first 429 ends the run. Other errors are never
//! retried.

use crate::config::{RateLimitPolicy, ReasoningEffort};
use crate::error::RequestError;
use crate::pipeline::encode::PageImage;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// One page worth of model input.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Rendered prompt text.
    pub prompt: String,
    pub image: PageImage,
    pub reasoning_effort: ReasoningEffort,
    pub max_output_tokens: usize,
}

/// What the model returned for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A multimodal model endpoint that turns one page image into text.
pub trait VisionClient: Send + Sync {
    /// Human-readable `provider/model` for logs.
    fn describe(&self) -> String;

    /// Issue a single request. Implementations do not retry.
    fn read_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<PageReply, RequestError>> + Send;
}

/// A successful page plus the rate-limit retries it needed.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub reply: PageReply,
    pub retries: u32,
}

/// Send one page, applying the rate-limit policy.
///
/// Returns the last `RequestError` when the policy is exhausted or when the
/// error is not a rate limit.
pub async fn process_page<C: VisionClient>(
    client: &C,
    request: &PageRequest,
    policy: &RateLimitPolicy,
    doc_name: &str,
    page_number: usize,
) -> Result<PageOutcome, RequestError> {
    let mut attempt: u32 = 0;
    loop {
        match client.read_page(request).await {
            Ok(reply) => {
                debug!(
                    "{} page {}: {} input tokens, {} output tokens",
                    doc_name, page_number, reply.input_tokens, reply.output_tokens
                );
                return Ok(PageOutcome {
                    reply,
                    retries: attempt,
                });
            }
            Err(RequestError::RateLimited {
                retry_after_secs,
                detail,
            }) if attempt < policy.max_retries => {
                attempt += 1;
                let wait = policy.delay_ms(attempt, retry_after_secs);
                warn!(
                    "{} page {}: rate limited ({}); retry {}/{} after {}ms",
                    doc_name, page_number, detail, attempt, policy.max_retries, wait
                );
                sleep(Duration::from_millis(wait)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
