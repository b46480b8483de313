//! End-to-end tests for the estimation pipeline.
//!
//! Search and completion calls go to a mock server. Liveness checks for
//! allowlisted hosts are routed to the same server by path, so the real
//! reqwest transport is exercised without touching the network.

use std::sync::Arc;

use async_trait::async_trait;
use kibble_search::providers::openai::DEFAULT_MODEL;
use kibble_search::sources::FetchedPage;
use kibble_search::{
    EstimateError, Estimator, LlmExtractor, OpenAiConfig, OpenAiProvider, PageFetcher,
    PatternExtractor, PipelineConfig, ReqwestFetcher, TavilyConfig, TavilyProvider,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sends every liveness request to `base` with the requested path, and reports the
/// requested URL back.
struct LocalFetcher {
    base: String,
    inner: ReqwestFetcher,
}

#[async_trait]
impl PageFetcher for LocalFetcher {
    async fn fetch(&self, url: &str) -> kibble_search::Result<FetchedPage> {
        let path = Url::parse(url)
            .map(|u| u.path().to_owned())
            .unwrap_or_default();
        let mut page = self.inner.fetch(&format!("{}{path}", self.base)).await?;
        page.final_url = None;
        Ok(page)
    }
}

fn estimator_with(server: &MockServer, extractor: Arc<dyn kibble_search::Extractor>) -> Estimator {
    let config = PipelineConfig::default();
    let search = TavilyProvider::new(
        TavilyConfig::new("tvly-test").with_base_url(server.uri()),
        reqwest::Client::new(),
    );
    let fetcher = LocalFetcher {
        base: server.uri(),
        inner: ReqwestFetcher::from_config(&config).expect("client"),
    };
    Estimator::new(Arc::new(search), Arc::new(fetcher), extractor, config).expect("estimator")
}

async fn mount_search(server: &MockServer, results: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!("<html>{}</html>", "feeding chart ".repeat(100))),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn acme_kibble_end_to_end() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([
            {"url": "https://www.purina.com/acme-kibble", "content": "density 113g"},
            {"url": "https://www.facebook.com/acme-kibble", "content": "we love it"}
        ]),
    )
    .await;
    mount_page(&server, "/acme-kibble").await;

    let est = estimator_with(&server, Arc::new(PatternExtractor));
    let result = est.estimate("Acme Kibble", false).await.expect("estimate");

    assert_eq!(result.brand, "Acme Kibble");
    assert_eq!(result.grams_per_cup, 113);
    assert_eq!(result.sources, vec!["https://www.purina.com/acme-kibble"]);

    let body = serde_json::to_value(&result).expect("serialize");
    assert!(body.get("debug").is_none());
}

#[tokio::test]
async fn search_outage_yields_default_density() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let est = estimator_with(&server, Arc::new(PatternExtractor));
    let result = est.estimate("Acme", true).await.expect("estimate");

    assert_eq!(result.grams_per_cup, 112);
    assert!(result.sources.is_empty());
    let debug = result.debug.expect("diagnostics");
    assert_eq!(debug.search_status, Some(503));
    assert!(debug
        .notes
        .iter()
        .any(|n| n.contains("typical dry kibble density")));
}

#[tokio::test]
async fn dead_sources_are_dropped() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([
            {"url": "https://www.chewy.com/dead-link", "content": "1 cup weighs 120 grams"},
            {"url": "https://www.petco.com/live-link", "content": ""}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dead-link"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/live-link").await;

    let est = estimator_with(&server, Arc::new(PatternExtractor));
    let result = est.estimate("Acme", true).await.expect("estimate");

    assert_eq!(result.sources, vec!["https://www.petco.com/live-link"]);
    // Text from dead pages still informs extraction.
    assert_eq!(result.grams_per_cup, 120);
    let debug = result.debug.expect("diagnostics");
    assert_eq!(debug.ranked, 2);
    assert_eq!(debug.vetted, 1);
    assert_eq!(debug.evidence, vec![120]);
}

#[tokio::test]
async fn llm_extractor_end_to_end() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([{"url": "https://www.hillspet.com/acme-nutrition", "content": "calorie content"}]),
    )
    .await;
    mount_page(&server, "/acme-nutrition").await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": "```json\n{\"grams_per_cup\": 104.4, \"sources\": [\"https://www.hillspet.com/acme-nutrition\"]}\n```"
            }}]
        })))
        .mount(&server)
        .await;

    let completion = OpenAiProvider::new(
        OpenAiConfig::new("sk-test", DEFAULT_MODEL).with_base_url(server.uri()),
        reqwest::Client::new(),
    );
    let est = estimator_with(&server, Arc::new(LlmExtractor::new(Arc::new(completion))));
    let result = est.estimate("Acme", true).await.expect("estimate");

    assert_eq!(result.grams_per_cup, 104);
    assert_eq!(result.confidence, Some(0.7));
    let debug = result.debug.expect("diagnostics");
    assert_eq!(debug.extractor, "llm");
    assert_eq!(debug.cited, vec!["https://www.hillspet.com/acme-nutrition"]);
    assert_eq!(debug.completion_status, Some(200));
    assert_eq!(debug.search_status, None);
}

#[tokio::test]
async fn llm_rate_limit_reports_completion_status() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([{"url": "https://www.hillspet.com/acme-nutrition", "content": "calorie content"}]),
    )
    .await;
    mount_page(&server, "/acme-nutrition").await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        })))
        .mount(&server)
        .await;

    let completion = OpenAiProvider::new(
        OpenAiConfig::new("sk-test", DEFAULT_MODEL).with_base_url(server.uri()),
        reqwest::Client::new(),
    );
    let est = estimator_with(&server, Arc::new(LlmExtractor::new(Arc::new(completion))));
    let result = est.estimate("Acme", true).await.expect("estimate");

    assert_eq!(result.grams_per_cup, 112);
    assert_eq!(result.sources, vec!["https://www.hillspet.com/acme-nutrition"]);
    let debug = result.debug.expect("diagnostics");
    assert_eq!(debug.completion_status, Some(429));
    assert_eq!(debug.search_status, None);
    assert!(debug.search_error.is_none());
    assert!(debug.notes[0].contains("Rate limit reached"));

    let body = serde_json::to_value(&debug).expect("serialize");
    assert_eq!(body["completion_status"], 429);
}

#[tokio::test]
async fn blank_brand_is_rejected_before_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let est = estimator_with(&server, Arc::new(PatternExtractor));
    let err = est.estimate("", false).await.unwrap_err();
    assert!(matches!(err, EstimateError::BrandRequired));
}
