//! Tavily search API client.
//!
//! Tavily returns page URLs together with extracted page text, which is
//! exactly what the extractors need. The API key travels in the request
//! body rather than a header, the most widely supported form.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::provider::SearchProvider;
use crate::types::SearchResult;

/// Default Tavily API base URL.
pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Configuration for the Tavily client.
#[derive(Clone)]
pub struct TavilyConfig {
    /// API key sent with every request.
    pub api_key: String,
    /// Base URL (defaults to [`TAVILY_BASE_URL`]).
    pub base_url: String,
}

impl std::fmt::Debug for TavilyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyConfig")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TavilyConfig {
    /// Create a config with the given API key and the default base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: TAVILY_BASE_URL.into(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// JSON body of a `POST /search` request.
#[derive(Debug, Serialize)]
pub struct TavilyRequest<'a> {
    /// Search query.
    pub query: &'a str,
    /// Maximum number of results.
    pub max_results: usize,
    /// API key.
    pub api_key: &'a str,
}

/// JSON body of a `POST /search` response. Missing `results` decode as empty.
///
/// Entries are kept as raw JSON so a single malformed entry is dropped by
/// [`TavilyResponse::into_results`] instead of failing the whole response.
#[derive(Debug, Default, Deserialize)]
pub struct TavilyResponse {
    /// Search results, best first.
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

impl TavilyResponse {
    /// Decode every usable entry, in order.
    pub fn into_results(self) -> Vec<SearchResult> {
        self.results
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<SearchResult>(entry) {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed tavily result");
                    None
                }
            })
            .collect()
    }
}

/// [`SearchProvider`] backed by the Tavily search API.
pub struct TavilyProvider {
    config: TavilyConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyProvider")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl TavilyProvider {
    /// Create a provider using `client` for all requests.
    pub fn new(config: TavilyConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        if self.config.api_key.trim().is_empty() {
            return Err(SearchError::Provider("Tavily API key is not configured".into()));
        }

        tracing::trace!(query, max_results, "tavily search");

        let body = TavilyRequest {
            query,
            max_results,
            api_key: &self.config.api_key,
        };
        let response = self.client.post(self.endpoint()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                message: super::extract_error_message(&text),
            });
        }

        let text = response.text().await?;
        let parsed: TavilyResponse = serde_json::from_str(&text)
            .map_err(|e| SearchError::Parse(format!("tavily response: {e}")))?;

        let mut results = parsed.into_results();
        results.truncate(max_results);
        tracing::debug!(count = results.len(), "tavily returned results");
        Ok(results)
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialises_key_in_body() {
        let body = TavilyRequest {
            query: "Acme dog food grams per cup",
            max_results: 5,
            api_key: "tvly-test",
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "query": "Acme dog food grams per cup",
                "max_results": 5,
                "api_key": "tvly-test"
            })
        );
    }

    #[test]
    fn response_without_results_is_empty() {
        let parsed: TavilyResponse = serde_json::from_str(r#"{"answer":null}"#).expect("parse");
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn response_ignores_extra_fields() {
        let parsed: TavilyResponse = serde_json::from_str(
            r#"{"results":[{"url":"https://www.purina.com/a-b","title":"t","content":"c","score":0.9}]}"#,
        )
        .expect("parse");
        let results = parsed.into_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "c");
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let parsed: TavilyResponse = serde_json::from_str(
            r#"{"results":[
                {"url":"https://www.purina.com/acme-one","content":null},
                null,
                "https://www.chewy.com/stray",
                {"url":"https://www.chewy.com/acme-two","content":"113 g per cup"}
            ]}"#,
        )
        .expect("parse");
        let results = parsed.into_results();
        assert_eq!(
            results,
            vec![
                SearchResult::new("https://www.purina.com/acme-one", ""),
                SearchResult::new("https://www.chewy.com/acme-two", "113 g per cup"),
            ]
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let provider = TavilyProvider::new(
            TavilyConfig::new("k").with_base_url("http://localhost:9999/"),
            reqwest::Client::new(),
        );
        assert_eq!(provider.endpoint(), "http://localhost:9999/search");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = TavilyConfig::new("tvly-secret");
        assert!(!format!("{config:?}").contains("tvly-secret"));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let provider = TavilyProvider::new(TavilyConfig::new(" "), reqwest::Client::new());
        let err = provider.search("acme", 5).await.unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
