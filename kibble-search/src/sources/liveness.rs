//! Liveness filtering: keep only candidates that resolve to real pages.
//!
//! Candidates are checked one at a time in rank order. A check accepts a URL
//! when the server answers exactly `200` and the page is not an obvious
//! stub: non-HTML resources (PDF feeding charts, for instance) pass on
//! status alone, HTML pages must carry more than [`MIN_BODY_CHARS`]
//! characters of body and must not read like an error page.

use std::sync::OnceLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::fetch::PageFetcher;
use super::sanitize::sanitize;

/// HTML pages with at most this many characters are treated as stubs.
pub const MIN_BODY_CHARS: usize = 800;

/// Phrases that mark an HTML page as an error or tombstone page.
const NOT_FOUND_PATTERN: &str = r"(?i)404|not found|moved|no longer exists";

fn not_found_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NOT_FOUND_PATTERN).ok()).as_ref()
}

/// Returns `true` if `body` looks like a "not found / moved" page.
pub fn looks_like_error_page(body: &str) -> bool {
    not_found_regex().is_some_and(|re| re.is_match(body))
}

/// Check `urls` in order and return up to `max_accepted` live URLs.
///
/// Each accepted entry is the post-redirect URL when the transport reports
/// one. Fetch failures skip the URL without retrying. Checking stops as soon
/// as `max_accepted` URLs have been collected, or when `cancel` fires, in
/// which case the URLs accepted so far are returned.
pub async fn filter_live<S: AsRef<str>>(
    urls: &[S],
    max_accepted: usize,
    fetcher: &dyn PageFetcher,
    cancel: &CancellationToken,
) -> Vec<String> {
    let mut accepted = Vec::new();
    if max_accepted == 0 {
        return accepted;
    }

    for raw in urls {
        let Some(url) = sanitize(Some(raw.as_ref())) else {
            continue;
        };

        let verdict = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(accepted = accepted.len(), "liveness checks cancelled");
                break;
            }
            verdict = check_live(&url, fetcher) => verdict,
        };

        if let Some(live) = verdict {
            accepted.push(live);
            if accepted.len() >= max_accepted {
                break;
            }
        }
    }

    accepted
}

/// Check one sanitised URL, returning the URL to report if it is live.
async fn check_live(url: &str, fetcher: &dyn PageFetcher) -> Option<String> {
    let page = match fetcher.fetch(url).await {
        Ok(page) => page,
        Err(err) => {
            tracing::debug!(%url, error = %err, "liveness fetch failed");
            return None;
        }
    };

    if page.status != 200 {
        tracing::debug!(%url, status = page.status, "liveness rejected status");
        return None;
    }

    let final_url = page
        .final_url
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| url.to_owned());

    if !page.is_html() {
        return Some(final_url);
    }

    // Content-Length counts bytes, and a body never has more chars than bytes.
    if page.content_length.is_some_and(|len| len < MIN_BODY_CHARS as u64) {
        tracing::debug!(%url, "liveness rejected short content-length");
        return None;
    }

    let body = match page.text().await {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!(%url, error = %err, "liveness body read failed");
            return None;
        }
    };

    let chars = body.chars().count();
    if chars > MIN_BODY_CHARS && !looks_like_error_page(&body) {
        Some(final_url)
    } else {
        tracing::debug!(%url, chars, "liveness rejected stub body");
        None
    }
}
