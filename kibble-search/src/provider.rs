//! Trait definitions for the external services the pipeline calls.
//!
//! [`SearchProvider`] turns a query into `{url, content}` results and
//! [`CompletionProvider`] turns a prompt into free-form text. Concrete
//! clients live in [`crate::providers`]; tests substitute mocks.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SearchResult;

/// A web search backend returning page URLs with extracted text.
///
/// All implementations must be `Send + Sync` so one instance can serve
/// concurrent requests.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return at most `max_results` results, best first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError`] if the request fails, the provider
    /// answers with a non-success status, or the body cannot be decoded.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;

    /// Short provider name used in logs.
    fn name(&self) -> &str;
}

/// A model reply together with the transport status that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Reply text.
    pub text: String,
    /// HTTP status of the call, for HTTP-backed providers.
    pub status: Option<u16>,
}

impl Completion {
    /// A reply with no transport status.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: None,
        }
    }

    /// Attach the HTTP status of the call.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// A language model that answers a single prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a system instruction and user prompt, returning the reply.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError`] if the request fails, the provider
    /// answers with a non-success status, or the reply has no text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion>;

    /// Short provider name used in logs.
    fn name(&self) -> &str;
}
