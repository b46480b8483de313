//! OpenAI Chat Completions client for JSON-mode prompts.
//!
//! Only the non-streaming `/v1/chat/completions` endpoint is used, with
//! `response_format: {"type": "json_object"}` so the model is constrained
//! to emit a single JSON object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::provider::{Completion, CompletionProvider};

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default model for density extraction.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature; low to keep numeric answers stable.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Configuration for the OpenAI client.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key for bearer authentication.
    pub api_key: String,
    /// Base URL (defaults to [`OPENAI_BASE_URL`]).
    pub base_url: String,
    /// The model to use.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Create a config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Message text.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// JSON body of a chat completion request.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    response_format: ResponseFormat,
}

/// Build the request body for a JSON-mode completion.
pub fn build_chat_request(config: &OpenAiConfig, system: &str, prompt: &str) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".into(),
                content: Some(system.into()),
            },
            ChatMessage {
                role: "user".into(),
                content: Some(prompt.into()),
            },
        ],
        temperature: config.temperature,
        response_format: ResponseFormat {
            kind: "json_object",
        },
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// JSON body of a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Text of the first choice, if any.
    pub fn first_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

/// [`CompletionProvider`] backed by the OpenAI Chat Completions API.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider using `client` for all requests.
    pub fn new(config: OpenAiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion> {
        if self.config.api_key.trim().is_empty() {
            return Err(SearchError::Provider("OpenAI API key is not configured".into()));
        }

        let body = build_chat_request(&self.config, system, prompt);
        tracing::debug!(model = %self.config.model, "openai chat request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                message: super::extract_error_message(&text),
            });
        }

        let text = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| SearchError::Parse(format!("openai response: {e}")))?;

        parsed
            .first_content()
            .map(|text| Completion::new(text).with_status(status.as_u16()))
            .ok_or_else(|| SearchError::Parse("openai response has no message content".into()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
