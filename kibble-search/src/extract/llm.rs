//! Language-model density extraction.
//!
//! The model receives the brand and a bounded slice of the search result
//! text and must answer with a JSON object holding `grams_per_cup` and
//! `sources`. Replies are parsed strictly first, then again with Markdown
//! code fences removed; anything still lacking a numeric `grams_per_cup`
//! becomes the fallback estimate.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::provider::CompletionProvider;
use crate::sources::sanitize::sanitize;
use crate::types::{round_grams, DensityEstimate, SearchResult};

use super::{fallback_estimate, is_plausible, Extractor, ExtractorKind};

/// Characters of content kept per search result.
pub const MAX_SOURCE_CHARS: usize = 3_000;

/// Characters of combined context sent to the model.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

/// Raw search URLs cited when the model's answer is unusable.
pub const FALLBACK_CITED_URLS: usize = 3;

/// Confidence reported when the model produced a numeric answer.
pub const LLM_CONFIDENCE: f64 = 0.7;

/// System instruction sent with every prompt.
pub const SYSTEM_PROMPT: &str = "Return only valid JSON. No preface.";

/// The fields read from the model's JSON reply.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmAnswer {
    /// Reported grams per cup.
    pub grams_per_cup: f64,
    /// URLs the model cited; non-string entries are ignored.
    pub sources: Vec<String>,
}

/// Truncate `s` to at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Join results into the `URL:` / `CONTENT:` context block, capping each
/// result's content at [`MAX_SOURCE_CHARS`].
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "URL: {}\nCONTENT: {}",
                r.url,
                truncate_chars(&r.content, MAX_SOURCE_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the user prompt for `brand`, capping the context at
/// [`MAX_CONTEXT_CHARS`].
pub fn build_prompt(brand: &str, results: &[SearchResult]) -> String {
    let context = build_context(results);
    format!(
        "You are a precise nutrition data extractor. Given context from the web about a dry dog \
         food brand, extract its grams per cup value (g/cup). If multiple, pick the most reliable. \
         If unclear, estimate a reasonable typical value for dry kibble and say why in a one-line \
         note. Output STRICT JSON with keys: grams_per_cup (number), sources (array of URLs).\n\n\
         BRAND: {brand}\nCONTEXT:\n{}\n",
        truncate_chars(&context, MAX_CONTEXT_CHARS)
    )
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````).
pub fn strip_code_fences(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse the model's reply, strictly and then leniently.
///
/// Returns `None` when neither attempt yields an object with a numeric
/// `grams_per_cup`.
pub fn parse_answer(text: &str) -> Option<LlmAnswer> {
    let value = serde_json::from_str::<Value>(text)
        .or_else(|_| serde_json::from_str::<Value>(strip_code_fences(text)))
        .ok()?;

    let grams_per_cup = value.get("grams_per_cup")?.as_f64()?;
    if !grams_per_cup.is_finite() {
        return None;
    }

    let sources = value
        .get("sources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Some(LlmAnswer {
        grams_per_cup,
        sources,
    })
}

/// [`Extractor`] that delegates the numeric judgement to a language model.
pub struct LlmExtractor {
    provider: Arc<dyn CompletionProvider>,
}

impl std::fmt::Debug for LlmExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmExtractor")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl LlmExtractor {
    /// Create an extractor that prompts `provider`.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    fn fallback(results: &[SearchResult], note: String, status: Option<u16>) -> DensityEstimate {
        let mut estimate = fallback_estimate(note);
        estimate.provider_status = status;
        estimate.cited = results
            .iter()
            .take(FALLBACK_CITED_URLS)
            .map(|r| r.url.clone())
            .collect();
        estimate
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, brand: &str, results: &[SearchResult]) -> DensityEstimate {
        let prompt = build_prompt(brand, results);

        let reply = match self.provider.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    status = ?err.status(),
                    error = %err,
                    "completion failed"
                );
                return Self::fallback(
                    results,
                    format!("{} request failed ({err}); using typical dry kibble density", self.provider.name()),
                    err.status(),
                );
            }
        };

        let Some(answer) = parse_answer(&reply.text) else {
            tracing::debug!(len = reply.text.len(), "model reply lacked a numeric grams_per_cup");
            return Self::fallback(
                results,
                "model reply had no numeric grams_per_cup; using typical dry kibble density".into(),
                reply.status,
            );
        };

        if answer.grams_per_cup <= 0.0 {
            tracing::debug!(value = answer.grams_per_cup, "model reported a non-positive density");
            return Self::fallback(
                results,
                format!(
                    "model reported {} g/cup, which is not a density; using typical dry kibble density",
                    answer.grams_per_cup
                ),
                reply.status,
            );
        }

        let rounded = round_grams(answer.grams_per_cup);
        let mut notes = vec![format!("model reported {} g/cup", answer.grams_per_cup)];
        if f64::from(rounded) < answer.grams_per_cup.round() {
            notes.push(format!("value clamped to {rounded} g/cup"));
        }
        if !is_plausible(rounded) {
            notes.push(format!("{rounded} g/cup is outside the plausible range"));
        }

        DensityEstimate {
            value: answer.grams_per_cup.min(f64::from(u32::MAX)),
            confidence: LLM_CONFIDENCE,
            evidence: vec![rounded],
            notes,
            cited: answer
                .sources
                .iter()
                .filter_map(|s| sanitize(Some(s)))
                .collect(),
            provider_status: reply.status,
        }
    }

    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Llm
    }
}
