//! Core types shared by the ranking, liveness and extraction stages.

use serde::{Deserialize, Deserializer, Serialize};

/// A single result returned by the search provider.
///
/// Missing, `null` or non-string fields decode as empty strings, so one
/// malformed entry does not spoil the rest of a batch. Empty URLs never
/// survive sanitising.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The URL of the result page.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
    /// Text content the provider extracted from the page.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub content: String,
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => s,
        _ => String::new(),
    })
}

impl SearchResult {
    /// Build a result from a URL and its text content.
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
        }
    }
}

/// A sanitised candidate URL annotated with its trust score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedUrl {
    /// Canonical URL as produced by the sanitizer.
    pub url: String,
    /// Trust score; higher is more trusted.
    pub score: i32,
}

/// A numeric density estimate distilled from free text.
///
/// `value` is always populated: when nothing usable is found the extractor
/// falls back to a typical dry-kibble density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityEstimate {
    /// Estimated grams per cup.
    pub value: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Plausible candidate values that contributed to `value`.
    pub evidence: Vec<u32>,
    /// Human-readable notes describing how the value was reached.
    pub notes: Vec<String>,
    /// URLs the extractor itself cited, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cited: Vec<String>,
    /// HTTP status of the extractor's own upstream call, if it made one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<u16>,
}

impl DensityEstimate {
    /// Grams per cup rounded to the nearest whole gram.
    pub fn grams_per_cup(&self) -> u32 {
        round_grams(self.value)
    }
}

/// Round `value` to whole grams, clamped to `0..=u32::MAX`. NaN maps to 0.
pub fn round_grams(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Internal counters and statuses attached to a response on request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Number of results the search provider returned.
    pub search_results: usize,
    /// HTTP status of a failed search call, when one was returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_status: Option<u16>,
    /// HTTP status of the extractor's completion call (`llm` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_status: Option<u16>,
    /// Description of a search provider failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_error: Option<String>,
    /// Candidates left after sanitising, allowlisting and truncation.
    pub ranked: usize,
    /// Candidates that passed the liveness filter.
    pub vetted: usize,
    /// Name of the extractor that produced the value.
    pub extractor: String,
    /// Plausible values the extractor found.
    pub evidence: Vec<u32>,
    /// Extractor notes.
    pub notes: Vec<String>,
    /// URLs cited by the extractor.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cited: Vec<String>,
    /// Whether this answer was served from the estimate cache.
    pub cache_hit: bool,
}

/// The final answer for one brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// The brand as requested (trimmed).
    pub brand: String,
    /// Estimated grams per cup.
    pub grams_per_cup: u32,
    /// Live, substantive source URLs in rank order.
    pub sources: Vec<String>,
    /// Confidence of the numeric estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Diagnostics, present only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Diagnostics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_deserializes_without_content() {
        let result: SearchResult =
            serde_json::from_str(r#"{"url":"https://www.purina.com/dog"}"#).expect("deserialize");
        assert_eq!(result.url, "https://www.purina.com/dog");
        assert!(result.content.is_empty());
    }

    #[test]
    fn search_result_tolerates_null_and_non_string_fields() {
        let results: Vec<SearchResult> = serde_json::from_str(
            r#"[{"url":"https://www.chewy.com/dp/123","content":null},
                {"url":null,"content":"113 g per cup"},
                {"content":42}]"#,
        )
        .expect("deserialize");
        assert_eq!(results[0], SearchResult::new("https://www.chewy.com/dp/123", ""));
        assert_eq!(results[1], SearchResult::new("", "113 g per cup"));
        assert_eq!(results[2], SearchResult::new("", ""));
    }

    #[test]
    fn grams_per_cup_rounds_half_up() {
        let estimate = DensityEstimate {
            value: 112.5,
            confidence: 0.9,
            evidence: vec![110, 115],
            notes: vec![],
            cited: vec![],
            provider_status: None,
        };
        assert_eq!(estimate.grams_per_cup(), 113);
    }

    #[test]
    fn round_grams_clamps_explicitly() {
        assert_eq!(round_grams(-4.0), 0);
        assert_eq!(round_grams(f64::NAN), 0);
        assert_eq!(round_grams(1e12), u32::MAX);
        assert_eq!(round_grams(104.4), 104);
    }

    #[test]
    fn result_omits_absent_optional_fields() {
        let result = EstimationResult {
            brand: "Acme".into(),
            grams_per_cup: 112,
            sources: vec![],
            confidence: None,
            debug: None,
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"brand": "Acme", "grams_per_cup": 112, "sources": []})
        );
    }

    #[test]
    fn diagnostics_skip_missing_search_error() {
        let diagnostics = Diagnostics {
            search_results: 2,
            extractor: "patterns".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&diagnostics).expect("serialize");
        assert!(json.get("search_error").is_none());
        assert!(json.get("completion_status").is_none());
        assert!(json.get("cited").is_none());
        assert_eq!(json["search_results"], 2);
    }
}
