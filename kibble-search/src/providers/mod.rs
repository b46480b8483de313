//! Concrete clients for the search and language model providers.

pub mod openai;
pub mod tavily;

pub use openai::{OpenAiConfig, OpenAiProvider};
pub use tavily::{TavilyConfig, TavilyProvider};

/// Extract an error message from a provider error response body.
///
/// Understands `{"error": {"message": ...}}`, `{"error": "..."}` and
/// `{"detail": ...}`; anything else is returned verbatim.
pub(crate) fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    value
        .get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .or_else(|| value.get("detail"))
        .and_then(|m| match m {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| body.to_string())
}
