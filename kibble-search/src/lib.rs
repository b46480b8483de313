//! # kibble-search
//!
//! Grams-per-cup density estimates for dry pet food brands.
//!
//! Given a brand name, the pipeline searches the web, keeps reputable and
//! reachable sources, and extracts a density value from the result text.
//! Every stage degrades gracefully: an estimate is always produced for a
//! non-blank brand, falling back to a typical kibble density of 112 g/cup.
//!
//! ## Design
//!
//! - [`sources::sanitize`] cleans the URLs search engines and models return
//! - [`sources::rank`] orders URLs by an allowlist of pet food publishers
//! - [`sources::filter_live`] checks candidates sequentially until enough
//!   reachable, non-stub pages are found
//! - [`extract`] turns text into a value, by regex or by language model
//! - [`Estimator`] ties the stages together, with an optional TTL cache
//!
//! ## Security
//!
//! - API keys are never logged; provider configs redact them in `Debug`
//! - Brand queries are logged at debug level only

pub mod cache;
pub mod config;
pub mod error;
pub mod estimator;
pub mod extract;
pub mod http;
pub mod provider;
pub mod providers;
pub mod sources;
pub mod types;

pub use config::PipelineConfig;
pub use error::{EstimateError, Result, SearchError};
pub use estimator::{density_query, Estimator};
pub use extract::{Extractor, ExtractorKind, LlmExtractor, PatternExtractor};
pub use provider::{Completion, CompletionProvider, SearchProvider};
pub use providers::{OpenAiConfig, OpenAiProvider, TavilyConfig, TavilyProvider};
pub use sources::{PageFetcher, ReqwestFetcher, SourcePolicy};
pub use types::{DensityEstimate, Diagnostics, EstimationResult, SearchResult};
