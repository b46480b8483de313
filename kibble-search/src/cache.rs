//! In-memory cache of finished estimates.
//!
//! Keyed by the (trimmed, lowercased brand, extractor) pair. Uses [`moka`]
//! for async-friendly caching with TTL and automatic eviction. Disabled
//! unless a non-zero TTL is configured.

use std::time::Duration;

use moka::future::Cache;

use crate::extract::ExtractorKind;
use crate::types::EstimationResult;

/// Maximum number of cached estimates.
const MAX_CACHE_ENTRIES: u64 = 1_000;

/// Composite cache key: normalised brand + extractor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    brand: String,
    extractor: ExtractorKind,
}

impl CacheKey {
    /// Build a key; brand case and surrounding whitespace are ignored.
    pub fn new(brand: &str, extractor: ExtractorKind) -> Self {
        Self {
            brand: brand.trim().to_lowercase(),
            extractor,
        }
    }
}

/// A bounded TTL cache of [`EstimationResult`] values.
#[derive(Clone)]
pub struct EstimateCache {
    inner: Cache<CacheKey, EstimationResult>,
}

impl std::fmt::Debug for EstimateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimateCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl EstimateCache {
    /// Create a cache with the given TTL, or `None` when `ttl_seconds` is 0.
    pub fn new(ttl_seconds: u64) -> Option<Self> {
        if ttl_seconds == 0 {
            return None;
        }
        let inner = Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();
        Some(Self { inner })
    }

    /// Look up a cached estimate.
    pub async fn get(&self, key: &CacheKey) -> Option<EstimationResult> {
        self.inner.get(key).await
    }

    /// Store an estimate. Diagnostics are stripped before storing.
    pub async fn insert(&self, key: CacheKey, mut result: EstimationResult) {
        result.debug = None;
        self.inner.insert(key, result).await;
    }
}
