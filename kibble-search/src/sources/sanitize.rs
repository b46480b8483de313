//! URL sanitisation for citation-style links.
//!
//! Search providers and language models both emit URLs that have been
//! mangled in transit: prefixed with `@`, split by whitespace, or cut off
//! mid-slug. [`sanitize`] repairs the cheap cases and rejects the rest.

use url::Url;

/// Shortest accepted URL, in characters, after cleanup.
const MIN_URL_CHARS: usize = 15;

/// Shortest accepted hostname, in characters.
const MIN_HOST_CHARS: usize = 4;

/// Suffixes that indicate a link was truncated mid-slug.
const TRUNCATED_SUFFIXES: &[&str] = &["-", "/a", "-a"];

/// Clean up a raw URL, returning its canonical form or `None` if it looks
/// malformed or truncated.
///
/// Applies the following steps:
///
/// 1. Trim, drop one leading `@`, and remove embedded whitespace and
///    control characters.
/// 2. Require an `http://` or `https://` scheme (case-insensitive).
/// 3. Reject strings shorter than 15 characters or ending in `-`, `/a`
///    or `-a`.
/// 4. Reject paths whose final segment is a single letter (`/x`).
/// 5. Reject hosts shorter than 4 characters, and anything unparseable.
///
/// The result is the `url` crate's serialisation. Steps 3 to 5 also hold for
/// that serialisation, so sanitising an already sanitised URL returns it
/// unchanged.
///
/// # Examples
///
/// ```
/// use kibble_search::sources::sanitize::sanitize;
///
/// assert_eq!(
///     sanitize(Some(" @https://www.Purina.com/dog food ")).as_deref(),
///     Some("https://www.purina.com/dogfood"),
/// );
/// assert_eq!(sanitize(Some("www.purina.com/dog-food")), None);
/// ```
pub fn sanitize(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    let trimmed = trimmed.strip_prefix('@').unwrap_or(trimmed);
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();

    if !has_http_scheme(&cleaned) {
        return None;
    }

    if too_short_or_truncated(&cleaned) {
        return None;
    }

    let parsed = Url::parse(&cleaned).ok()?;

    if has_single_letter_tail(parsed.path()) {
        return None;
    }

    if !parsed
        .host_str()
        .is_some_and(|host| host.chars().count() >= MIN_HOST_CHARS)
    {
        return None;
    }

    // Serialisation can shorten the URL (default ports, dot segments), so
    // the output must pass the same checks for the result to be a fixpoint.
    let canonical = parsed.to_string();
    if too_short_or_truncated(&canonical) {
        return None;
    }
    Some(canonical)
}

/// Length and truncated-slug checks shared by the raw and canonical forms.
fn too_short_or_truncated(s: &str) -> bool {
    s.chars().count() < MIN_URL_CHARS || TRUNCATED_SUFFIXES.iter().any(|suffix| s.ends_with(suffix))
}

/// Returns `true` if `s` starts with `http://` or `https://`, ignoring case.
fn has_http_scheme(s: &str) -> bool {
    let prefix = |p: &str| {
        s.get(..p.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(p))
    };
    prefix("http://") || prefix("https://")
}

/// Returns `true` if the path ends in `/` followed by exactly one ASCII letter.
fn has_single_letter_tail(path: &str) -> bool {
    let bytes = path.as_bytes();
    matches!(bytes, [.., b'/', last] if last.is_ascii_alphabetic())
}
