//! Density extraction strategies.
//!
//! Two interchangeable [`Extractor`] implementations turn search results
//! into a [`DensityEstimate`]:
//!
//! - [`PatternExtractor`] scans the text with phrasing patterns and keeps
//!   only physically plausible numbers. Deterministic, no I/O.
//! - [`LlmExtractor`] asks a language model for strict JSON and falls back
//!   to the typical density when the answer is unusable.
//!
//! Both always produce a value.

pub mod llm;
pub mod patterns;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{DensityEstimate, SearchResult};

pub use llm::LlmExtractor;
pub use patterns::PatternExtractor;

/// Lowest grams-per-cup value accepted as a real density.
pub const MIN_PLAUSIBLE_GRAMS: u32 = 85;

/// Highest grams-per-cup value accepted as a real density.
pub const MAX_PLAUSIBLE_GRAMS: u32 = 140;

/// Typical dry kibble density used when no value can be extracted.
pub const FALLBACK_GRAMS_PER_CUP: f64 = 112.0;

/// Confidence reported when no value could be extracted.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Returns `true` if `grams` lies in the inclusive plausibility range.
pub fn is_plausible(grams: u32) -> bool {
    (MIN_PLAUSIBLE_GRAMS..=MAX_PLAUSIBLE_GRAMS).contains(&grams)
}

/// The fallback estimate, annotated with `note`.
pub fn fallback_estimate(note: impl Into<String>) -> DensityEstimate {
    DensityEstimate {
        value: FALLBACK_GRAMS_PER_CUP,
        confidence: FALLBACK_CONFIDENCE,
        evidence: Vec::new(),
        notes: vec![note.into()],
        cited: Vec::new(),
        provider_status: None,
    }
}

/// Which extractor the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Regex phrasing patterns over the search result text.
    #[default]
    Patterns,
    /// A language model prompted for strict JSON.
    Llm,
}

impl ExtractorKind {
    /// Stable lowercase name, as used in configuration and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Patterns => "patterns",
            Self::Llm => "llm",
        }
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Turns search results for a brand into a density estimate.
///
/// Implementations never fail: upstream problems are folded into a
/// fallback estimate whose notes explain what went wrong.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Produce an estimate for `brand` from `results`.
    async fn extract(&self, brand: &str, results: &[SearchResult]) -> DensityEstimate;

    /// Which strategy this is.
    fn kind(&self) -> ExtractorKind;
}
