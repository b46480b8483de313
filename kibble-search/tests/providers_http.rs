//! HTTP contract tests for the Tavily and OpenAI clients against a local
//! mock server.

use kibble_search::providers::openai::DEFAULT_MODEL;
use kibble_search::{
    CompletionProvider, OpenAiConfig, OpenAiProvider, SearchError, SearchProvider, TavilyConfig,
    TavilyProvider,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tavily(server: &MockServer) -> TavilyProvider {
    TavilyProvider::new(
        TavilyConfig::new("tvly-test").with_base_url(server.uri()),
        reqwest::Client::new(),
    )
}

fn openai(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(
        OpenAiConfig::new("sk-test", DEFAULT_MODEL).with_base_url(server.uri()),
        reqwest::Client::new(),
    )
}

#[tokio::test]
async fn tavily_posts_query_and_returns_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({
            "query": "Acme dog food grams per cup",
            "max_results": 5,
            "api_key": "tvly-test"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "Acme dog food grams per cup",
            "results": [
                {"url": "https://www.purina.com/acme", "title": "Acme", "content": "about 113 g per cup"},
                {"url": "https://www.chewy.com/acme-feeding", "title": "Acme at Chewy"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = tavily(&server)
        .search("Acme dog food grams per cup", 5)
        .await
        .expect("search");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, "https://www.purina.com/acme");
    assert_eq!(results[0].content, "about 113 g per cup");
    assert_eq!(results[1].content, "");
}

#[tokio::test]
async fn tavily_null_content_does_not_discard_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"url": "https://www.purina.com/acme", "content": null},
                {"url": null, "content": "orphan text"},
                {"url": "https://www.chewy.com/acme-feeding", "content": "1 cup = 113 g"}
            ]
        })))
        .mount(&server)
        .await;

    let results = tavily(&server).search("Acme", 5).await.expect("search");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].url, "https://www.purina.com/acme");
    assert_eq!(results[0].content, "");
    assert_eq!(results[1].url, "");
    assert_eq!(results[2].content, "1 cup = 113 g");
}

#[tokio::test]
async fn tavily_truncates_to_max_results() {
    let server = MockServer::start().await;
    let results: Vec<_> = (0..8)
        .map(|i| json!({"url": format!("https://www.petco.com/item-{i}"), "content": ""}))
        .collect();
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
        .mount(&server)
        .await;

    let results = tavily(&server).search("Acme", 3).await.expect("search");
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn tavily_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": {"error": "Unauthorized"}})),
        )
        .mount(&server)
        .await;

    let err = tavily(&server).search("Acme", 5).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Unauthorized"));
}

#[tokio::test]
async fn tavily_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = tavily(&server).search("Acme", 5).await.unwrap_err();
    assert!(matches!(err, SearchError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn openai_sends_bearer_and_json_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"grams_per_cup\": 108, \"sources\": []}"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = openai(&server)
        .complete("Return only valid JSON. No preface.", "BRAND: Acme")
        .await
        .expect("completion");

    assert_eq!(reply.text, r#"{"grams_per_cup": 108, "sources": []}"#);
    assert_eq!(reply.status, Some(200));
}

#[tokio::test]
async fn openai_error_message_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        })))
        .mount(&server)
        .await;

    let err = openai(&server).complete("s", "p").await.unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert!(err.to_string().contains("Rate limit reached"));
}

#[tokio::test]
async fn openai_missing_content_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = openai(&server).complete("s", "p").await.unwrap_err();
    assert!(matches!(err, SearchError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn blank_openai_key_never_hits_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(
        OpenAiConfig::new("", DEFAULT_MODEL).with_base_url(server.uri()),
        reqwest::Client::new(),
    );
    let err = provider.complete("s", "p").await.unwrap_err();
    assert!(matches!(err, SearchError::Provider(_)));
}
