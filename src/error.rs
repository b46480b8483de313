//! Error types for the kibble-density service.

/// Failures that stop the service from starting.
///
/// Request-time failures never use this type: the pipeline degrades
/// upstream errors and the HTTP layer maps [`kibble_search::EstimateError`]
/// to a status code.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// The estimation pipeline could not be built.
    #[error("search error: {0}")]
    Search(#[from] kibble_search::SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ServiceError>;
