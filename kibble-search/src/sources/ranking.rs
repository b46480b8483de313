//! Trust scoring and allowlist filtering for candidate source URLs.
//!
//! Only manufacturer and major retailer sites survive ranking. Survivors
//! are scored by cheap substring heuristics:
//!
//! ```text
//! +2  per brand token or bonus keyword found in the lowercased URL
//! -3  per social-media fragment found
//! +1  if the URL uses https
//! +1  if the URL mentions nutrition, feeding or kcal
//! ```
//!
//! The bonus keywords therefore count twice: once through the token loop
//! and once through the final check.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RankedUrl;

use super::sanitize::sanitize;

/// Manufacturer and retailer domains whose pages are trusted for nutrition claims.
pub const ALLOW_DOMAINS: &[&str] = &[
    "purina.com",
    "hillspet.com",
    "royalcanin.com",
    "bluebuffalo.com",
    "orijen.ca",
    "acana.com",
    "chewy.com",
    "petsmart.com",
    "petco.com",
    "zooplus.com",
];

/// URL tokens that suggest a page carries feeding or nutrition data.
pub const BONUS_KEYWORDS: &[&str] = &["nutrition", "feeding", "kcal"];

/// Social-media fragments that demote a URL.
pub const AVOID_FRAGMENTS: &[&str] = &[
    "facebook.",
    "pinterest.",
    "twitter.",
    "x.com",
    "tiktok.",
    "instagram.",
];

const BRAND_TOKEN_POINTS: i32 = 2;
const AVOID_PENALTY: i32 = 3;
const HTTPS_POINTS: i32 = 1;
const KEYWORD_POINTS: i32 = 1;

/// The lists that drive ranking.
///
/// Defaults to [`ALLOW_DOMAINS`], [`BONUS_KEYWORDS`] and [`AVOID_FRAGMENTS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePolicy {
    /// Hostname suffixes a URL must match to be kept at all.
    pub allow_domains: Vec<String>,
    /// Keywords rewarded in addition to the brand tokens.
    pub bonus_keywords: Vec<String>,
    /// Fragments penalised wherever they appear in the URL.
    pub avoid_fragments: Vec<String>,
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self {
            allow_domains: to_owned_list(ALLOW_DOMAINS),
            bonus_keywords: to_owned_list(BONUS_KEYWORDS),
            avoid_fragments: to_owned_list(AVOID_FRAGMENTS),
        }
    }
}

impl SourcePolicy {
    /// Brand tokens (first label of each allowlisted domain) followed by
    /// the bonus keywords.
    pub fn preferred_tokens(&self) -> Vec<String> {
        self.allow_domains
            .iter()
            .filter_map(|d| d.split('.').next())
            .filter(|label| !label.is_empty())
            .map(str::to_lowercase)
            .chain(self.bonus_keywords.iter().map(|k| k.to_lowercase()))
            .collect()
    }

    /// Returns `true` if the URL's hostname ends with an allowlisted domain.
    ///
    /// Matching is a plain suffix test on the lowercased hostname.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        self.allow_domains
            .iter()
            .any(|d| host.ends_with(&d.to_lowercase()))
    }

    /// Returns `true` if the URL contains any avoid fragment.
    pub fn is_social(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.avoid_fragments
            .iter()
            .any(|f| lower.contains(&f.to_lowercase()))
    }

    /// Score a URL with the trust heuristics described at module level.
    pub fn score(&self, url: &str) -> i32 {
        let lower = url.to_lowercase();
        let mut score = 0;

        for token in self.preferred_tokens() {
            if lower.contains(&token) {
                score += BRAND_TOKEN_POINTS;
            }
        }
        for fragment in &self.avoid_fragments {
            if lower.contains(&fragment.to_lowercase()) {
                score -= AVOID_PENALTY;
            }
        }
        if lower.starts_with("https://") {
            score += HTTPS_POINTS;
        }
        if self
            .bonus_keywords
            .iter()
            .any(|k| lower.contains(&k.to_lowercase()))
        {
            score += KEYWORD_POINTS;
        }

        score
    }
}

/// Sanitise, allowlist-filter and score `urls`, most trusted first.
///
/// The sort is stable on `(score desc, is_social)`. Equally scored URLs keep
/// their input order, except that a URL matching an avoid fragment (see
/// [`SourcePolicy::is_social`]) sorts after every equally scored plain URL,
/// even when it came first in the input.
pub fn rank<S: AsRef<str>>(urls: &[S], policy: &SourcePolicy) -> Vec<RankedUrl> {
    let mut ranked: Vec<RankedUrl> = urls
        .iter()
        .filter_map(|u| sanitize(Some(u.as_ref())))
        .filter(|u| policy.is_allowed(u))
        .map(|url| {
            let score = policy.score(&url);
            RankedUrl { url, score }
        })
        .collect();

    // Equal scores keep input order, except that social URLs sink below
    // plain ones.
    ranked.sort_by_key(|r| (Reverse(r.score), policy.is_social(&r.url)));
    ranked
}

/// Same as [`rank`] but returns only the URLs.
pub fn rank_urls<S: AsRef<str>>(urls: &[S], policy: &SourcePolicy) -> Vec<String> {
    rank(urls, policy).into_iter().map(|r| r.url).collect()
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}
