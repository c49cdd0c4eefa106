use thiserror::Error;

/// Application-wide error types for diffstat.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a listing or pull-request page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A response or page could not be parsed (bad selector, unexpected shape).
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid poller or scheduler configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    ///
    /// The scheduler never retries a fetch itself; this is exposed for hosts
    /// that decide to re-run a cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout")
                    || msg.contains("connect")
                    || msg.contains("reset")
                    || msg.starts_with("HTTP 429")
                    || msg.starts_with("HTTP 5")
            }
            _ => false,
        }
    }
}
