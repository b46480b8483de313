//! Regex-based density extraction.
//!
//! Each pattern captures the number in one common phrasing of
//! "N grams per cup". Every capture from every pattern is collected, numbers
//! outside the plausibility range are discarded, and the distinct survivors
//! are averaged.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::types::{DensityEstimate, SearchResult};

use super::{fallback_estimate, is_plausible, Extractor, ExtractorKind};

/// Confidence reported when at least one plausible value was found.
pub const MATCH_CONFIDENCE: f64 = 0.9;

/// Phrasing patterns, applied to lowercased text. Group 1 is the number.
const DENSITY_PATTERNS: &[&str] = &[
    // "113 grams per cup", "113g/cup", "113 g per 1 cup", "113 grams a cup"
    r"\b(\d{1,4})\s*(?:g|gr|grams?)\s*(?:/|per|an?|each)\s*(?:1\s*|one\s+)?(?:8\s*oz\.?\s*)?cups?\b",
    // "cup weighs 113g", "1 cup = 113 grams", "cup is about 113 g"
    r"\bcups?\s*(?:weighs?|is|=|equals|contains|holds)\s*(?:about|approximately|approx\.?|roughly|around|~)?\s*(\d{1,4})\s*(?:g|gr|grams?)\b",
    // "density 113g", "density of about 113 grams", "density: 113 g/cup"
    r"\bdensity\b[^0-9]{0,24}?(\d{1,4})\s*(?:g|gr|grams?)\b",
    // "113 grams in one cup", "113 g in a standard cup", "113 grams for each cup"
    r"\b(\d{1,4})\s*(?:g|gr|grams?)\s+(?:in|for|of)\s+(?:one|1|a|each|every)\s+(?:(?:8\s*oz\.?|standard|measuring)\s+)?cups?\b",
];

fn density_regexes() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        DENSITY_PATTERNS
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::error!(pattern = %p, error = %err, "invalid density pattern");
                    None
                }
            })
            .collect()
    })
}

/// Every number captured by any density pattern, in pattern order, before
/// plausibility filtering.
pub fn candidate_values(text: &str) -> Vec<u32> {
    let lower = text.to_lowercase();
    density_regexes()
        .iter()
        .flat_map(|re| re.captures_iter(&lower))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .collect()
}

/// Extract a density estimate from free text.
///
/// Plausible values are deduplicated; the estimate is the rounded mean of
/// the distinct values with confidence [`MATCH_CONFIDENCE`]. Without any
/// plausible value the fallback estimate is returned.
///
/// # Examples
///
/// ```
/// use kibble_search::extract::patterns::extract_text;
///
/// let estimate = extract_text("1 cup weighs 113 grams");
/// assert_eq!(estimate.evidence, vec![113]);
/// assert_eq!(estimate.grams_per_cup(), 113);
/// ```
pub fn extract_text(text: &str) -> DensityEstimate {
    let candidates = candidate_values(text);
    let rejected = candidates.iter().filter(|v| !is_plausible(**v)).count();
    let accepted: BTreeSet<u32> = candidates.into_iter().filter(|v| is_plausible(*v)).collect();

    if accepted.is_empty() {
        let mut estimate =
            fallback_estimate("no plausible grams-per-cup value found; using typical dry kibble density");
        if rejected > 0 {
            estimate
                .notes
                .push(format!("discarded {rejected} implausible value(s)"));
        }
        return estimate;
    }

    let evidence: Vec<u32> = accepted.into_iter().collect();
    let sum: u32 = evidence.iter().sum();
    let mean = f64::from(sum) / evidence.len() as f64;

    let listed = evidence
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let mut notes = vec![format!(
        "found {} plausible value(s): {listed}",
        evidence.len()
    )];
    if rejected > 0 {
        notes.push(format!("discarded {rejected} implausible value(s)"));
    }

    DensityEstimate {
        value: mean.round(),
        confidence: MATCH_CONFIDENCE,
        evidence,
        notes,
        cited: Vec::new(),
        provider_status: None,
    }
}

/// [`Extractor`] that runs [`extract_text`] over all result contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

#[async_trait]
impl Extractor for PatternExtractor {
    async fn extract(&self, _brand: &str, results: &[SearchResult]) -> DensityEstimate {
        let combined = results
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        extract_text(&combined)
    }

    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Patterns
    }
}
