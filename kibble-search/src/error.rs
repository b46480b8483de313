//! Error types for the kibble-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. No API keys appear in error messages.

/// Errors raised by outbound calls and configuration checks.
///
/// None of these ever reach an HTTP client directly: the estimator degrades
/// every upstream failure to default data and records it in diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The HTTP request itself failed (DNS, TLS, connection reset, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// An upstream service answered with a non-success status.
    #[error("upstream returned status {status}: {message}")]
    Status {
        /// The HTTP status code returned.
        status: u16,
        /// Error text extracted from the response body.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// An outbound call exceeded its time budget.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// A provider is missing a credential or is otherwise unusable.
    #[error("provider error: {0}")]
    Provider(String),

    /// Invalid pipeline configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Returns the upstream HTTP status when the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Errors surfaced by [`crate::Estimator::estimate`].
///
/// Only these two outcomes ever fail a request; everything else degrades.
#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    /// The brand was missing or blank.
    #[error("brand required")]
    BrandRequired,

    /// The pipeline panicked or hit an unexpected failure.
    #[error("{0}")]
    Internal(String),
}

/// Convenience type alias for kibble-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_http() {
        let err = SearchError::Http("connection refused".into());
        assert_eq!(err.to_string(), "HTTP error: connection refused");
    }

    #[test]
    fn display_status() {
        let err = SearchError::Status {
            status: 429,
            message: "slow down".into(),
        };
        assert_eq!(err.to_string(), "upstream returned status 429: slow down");
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn display_parse() {
        let err = SearchError::Parse("expected value at line 1".into());
        assert_eq!(err.to_string(), "parse error: expected value at line 1");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn display_timeout() {
        let err = SearchError::Timeout("exceeded 10s limit".into());
        assert_eq!(err.to_string(), "request timed out: exceeded 10s limit");
    }

    #[test]
    fn display_config() {
        let err = SearchError::Config("max_sources must be > 0".into());
        assert_eq!(err.to_string(), "config error: max_sources must be > 0");
    }

    #[test]
    fn brand_required_message_is_stable() {
        assert_eq!(EstimateError::BrandRequired.to_string(), "brand required");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
        assert_send_sync::<EstimateError>();
    }
}
