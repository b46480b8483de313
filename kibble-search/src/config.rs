//! Pipeline configuration with sensible defaults.
//!
//! [`PipelineConfig`] controls how many search results are requested, how
//! many ranked candidates are checked, how many vetted sources are returned,
//! and the time budget for every outbound call.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Configuration for one density estimation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of results requested from the search provider.
    pub max_results: usize,
    /// Ranked candidates kept before liveness checks.
    pub ranked_limit: usize,
    /// Maximum number of vetted sources returned to the caller.
    pub max_sources: usize,
    /// Timeout in seconds for search and LLM provider calls.
    pub timeout_seconds: u64,
    /// Timeout in seconds for each liveness check.
    pub fetch_timeout_seconds: u64,
    /// How long to cache finished estimates. 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Custom User-Agent for liveness checks. If `None`, rotates through a
    /// built-in list of browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            ranked_limit: 12,
            max_sources: 3,
            timeout_seconds: 15,
            fetch_timeout_seconds: 10,
            cache_ttl_seconds: 0,
            user_agent: None,
        }
    }
}

impl PipelineConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_results`, `ranked_limit` and `max_sources` must be greater than 0
    /// - both timeouts must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.ranked_limit == 0 {
            return Err(SearchError::Config(
                "ranked_limit must be greater than 0".into(),
            ));
        }
        if self.max_sources == 0 {
            return Err(SearchError::Config(
                "max_sources must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.fetch_timeout_seconds == 0 {
            return Err(SearchError::Config(
                "fetch_timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
