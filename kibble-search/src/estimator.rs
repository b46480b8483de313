//! Density estimation orchestrator: search, vet sources, extract, assemble.
//!
//! One call to [`Estimator::estimate`] runs the whole pipeline for a brand:
//!
//! 1. Query the search provider (failures degrade to no results)
//! 2. Rank result URLs and keep the first `ranked_limit`
//! 3. Liveness-check candidates until `max_sources` are accepted
//! 4. Run the configured extractor over the result text
//! 5. Assemble the [`EstimationResult`], with diagnostics on request
//!
//! Only a blank brand fails the call. Panics inside the pipeline are caught
//! and reported as [`EstimateError::Internal`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheKey, EstimateCache};
use crate::config::PipelineConfig;
use crate::error::{EstimateError, SearchError};
use crate::extract::Extractor;
use crate::provider::SearchProvider;
use crate::sources::{filter_live, rank_urls, PageFetcher, SourcePolicy};
use crate::types::{Diagnostics, EstimationResult, SearchResult};

/// The search query sent for `brand`.
pub fn density_query(brand: &str) -> String {
    format!("{brand} dog food grams per cup")
}

/// Runs the estimation pipeline against a set of collaborators.
pub struct Estimator {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
    policy: SourcePolicy,
    config: PipelineConfig,
    cache: Option<EstimateCache>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("search", &self.search.name())
            .field("extractor", &self.extractor.kind())
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Estimator {
    /// Create an estimator with the default [`SourcePolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
        config: PipelineConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let cache = EstimateCache::new(config.cache_ttl_seconds);
        Ok(Self {
            search,
            fetcher,
            extractor,
            policy: SourcePolicy::default(),
            config,
            cache,
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the ranking lists.
    pub fn with_policy(mut self, policy: SourcePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop liveness checks when `token` is cancelled (e.g. on shutdown).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The active pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Estimate grams per cup for `brand`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::BrandRequired`] if `brand` is blank, and
    /// [`EstimateError::Internal`] if the pipeline panics. Upstream
    /// failures never produce an error.
    pub async fn estimate(
        &self,
        brand: &str,
        debug: bool,
    ) -> Result<EstimationResult, EstimateError> {
        let brand = brand.trim();
        if brand.is_empty() {
            return Err(EstimateError::BrandRequired);
        }

        AssertUnwindSafe(self.run(brand, debug))
            .catch_unwind()
            .await
            .map_err(|panic| {
                let message = panic_message(panic.as_ref());
                tracing::error!(error = %message, "estimation pipeline panicked");
                EstimateError::Internal(message)
            })
    }

    async fn run(&self, brand: &str, debug: bool) -> EstimationResult {
        let key = CacheKey::new(brand, self.extractor.kind());
        if let Some(cache) = &self.cache {
            if let Some(mut hit) = cache.get(&key).await {
                tracing::debug!(brand, "estimate served from cache");
                hit.brand = brand.to_owned();
                hit.debug = debug.then(|| Diagnostics {
                    extractor: self.extractor.kind().to_string(),
                    cache_hit: true,
                    ..Default::default()
                });
                return hit;
            }
        }

        let mut diagnostics = Diagnostics {
            extractor: self.extractor.kind().to_string(),
            ..Default::default()
        };

        let query = density_query(brand);
        tracing::debug!(brand, provider = self.search.name(), "searching");
        let results: Vec<SearchResult> =
            match self.search.search(&query, self.config.max_results).await {
                Ok(results) => results,
                Err(err) => {
                    tracing::warn!(provider = self.search.name(), error = %err, "search failed");
                    diagnostics.search_status = err.status();
                    diagnostics.search_error = Some(err.to_string());
                    Vec::new()
                }
            };
        diagnostics.search_results = results.len();

        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        let mut ranked = rank_urls(&urls, &self.policy);
        ranked.truncate(self.config.ranked_limit);
        diagnostics.ranked = ranked.len();

        let sources = filter_live(
            &ranked,
            self.config.max_sources,
            self.fetcher.as_ref(),
            &self.cancel,
        )
        .await;
        diagnostics.vetted = sources.len();

        let estimate = self.extractor.extract(brand, &results).await;

        let result = EstimationResult {
            brand: brand.to_owned(),
            grams_per_cup: estimate.grams_per_cup(),
            sources,
            confidence: Some(estimate.confidence),
            debug: None,
        };

        tracing::debug!(
            brand,
            grams_per_cup = result.grams_per_cup,
            sources = result.sources.len(),
            confidence = estimate.confidence,
            "estimate complete"
        );

        let completion_failed = estimate
            .provider_status
            .is_some_and(|status| !(200..300).contains(&status));
        if diagnostics.search_error.is_none() && !completion_failed {
            if let Some(cache) = &self.cache {
                cache.insert(key, result.clone()).await;
            }
        }

        diagnostics.evidence = estimate.evidence;
        diagnostics.notes = estimate.notes;
        diagnostics.cited = estimate.cited;
        diagnostics.completion_status = estimate.provider_status;

        EstimationResult {
            debug: debug.then_some(diagnostics),
            ..result
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "estimation pipeline panicked".to_owned()
    }
}
