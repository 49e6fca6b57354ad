//! edgequake-llm adapter and backend selection.
//!
//! [`ProviderClient`] sends the page through any provider the
//! `ProviderFactory` knows (Anthropic, Gemini, Mistral, Ollama, …). Those
//! providers have no reasoning-effort knob in `CompletionOptions`, so the
//! effort setting only reaches the wire through
//! [`ResponsesClient`](crate::pipeline::responses::ResponsesClient).
//!
//! Provider errors are mapped by [`LlmError`] variant, never by message text.

use crate::error::{Pdf2RagError, RequestError};
use crate::pipeline::llm::{PageReply, PageRequest, VisionClient};
use crate::pipeline::responses::ResponsesClient;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Provider name that selects the built-in Responses API client.
pub const OPENAI_PROVIDER: &str = "openai";

/// A [`VisionClient`] backed by an edgequake-llm provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    name: String,
    model: String,
}

impl ProviderClient {
    /// Wrap an already-built provider.
    pub fn new(provider: Arc<dyn LLMProvider>, name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
            model: model.into(),
        }
    }

    /// Instantiate a named provider with the given model.
    pub fn create(provider_name: &str, model: &str) -> Result<Self, Pdf2RagError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            Pdf2RagError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, provider_name, model))
    }
}

impl VisionClient for ProviderClient {
    fn describe(&self) -> String {
        format!("{}/{}", self.name, self.model)
    }

    async fn read_page(&self, request: &PageRequest) -> Result<PageReply, RequestError> {
        let messages = vec![ChatMessage::user_with_images(
            request.prompt.as_str(),
            vec![request.image.to_image_data()],
        )];
        let options = CompletionOptions {
            max_tokens: Some(request.max_output_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(classify_provider_error)?;

        debug!(
            "{}: {} prompt tokens, {} completion tokens",
            self.describe(),
            response.prompt_tokens,
            response.completion_tokens
        );

        Ok(PageReply {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Map an edgequake-llm error onto a [`RequestError`].
///
/// Only [`LlmError::RateLimited`] counts as a rate limit, so a message that
/// merely mentions one (a token count containing `429`, say) is not retried.
pub fn classify_provider_error(e: LlmError) -> RequestError {
    match e {
        LlmError::RateLimited(detail) => RequestError::RateLimited {
            retry_after_secs: None,
            detail,
        },
        LlmError::AuthError(detail) => RequestError::Auth(detail),
        LlmError::NetworkError(_) | LlmError::Timeout => RequestError::Transport(e.to_string()),
        LlmError::SerializationError(_) => RequestError::InvalidResponse(e.to_string()),
        other => RequestError::Provider(other.to_string()),
    }
}

/// The client the binaries and [`AnyClient::resolve`] hand to the pipeline.
pub enum AnyClient {
    Responses(ResponsesClient),
    Provider(ProviderClient),
}

impl AnyClient {
    /// Pick a backend.
    ///
    /// `None` or `"openai"` selects the Responses API client (needs
    /// `OPENAI_API_KEY`). Any other name goes through
    /// `ProviderFactory::create_llm_provider`; `"auto"` lets the factory
    /// detect a provider from the environment.
    pub fn resolve(
        provider: Option<&str>,
        model: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Self, Pdf2RagError> {
        match provider.map(str::trim) {
            None | Some("") | Some(OPENAI_PROVIDER) => {
                ResponsesClient::from_env(model, timeout_secs).map(AnyClient::Responses)
            }
            Some("auto") => {
                let (llm, _embedding) =
                    ProviderFactory::from_env().map_err(|e| Pdf2RagError::ProviderNotConfigured {
                        provider: "auto".to_string(),
                        hint: format!(
                            "No LLM provider could be auto-detected from environment.\n\
                            Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                            Error: {}",
                            e
                        ),
                    })?;
                Ok(AnyClient::Provider(ProviderClient::new(llm, "auto", model)))
            }
            Some(name) => ProviderClient::create(name, model).map(AnyClient::Provider),
        }
    }
}

impl VisionClient for AnyClient {
    fn describe(&self) -> String {
        match self {
            AnyClient::Responses(c) => c.describe(),
            AnyClient::Provider(c) => c.describe(),
        }
    }

    async fn read_page(&self, request: &PageRequest) -> Result<PageReply, RequestError> {
        match self {
            AnyClient::Responses(c) => c.read_page(request).await,
            AnyClient::Provider(c) => c.read_page(request).await,
        }
    }
}
