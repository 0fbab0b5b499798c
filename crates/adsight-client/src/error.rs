//! Error types for adsight-client

use thiserror::Error;

/// Result type alias for adsight-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in adsight-client
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from adsight-core
    #[error("Core error: {0}")]
    Core(#[from] adsight_core::Error),

    /// HTTP client error (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The settings service answered with a non-2xx status.
    #[error("settings service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The configured base URL cannot address the settings endpoints.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl {
        /// The configured URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The account id cannot be addressed as a single path segment.
    #[error("invalid account id '{0}'")]
    InvalidAccount(String),
}

impl Error {
    /// Creates an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether retrying the same request might succeed.
    ///
    /// Nothing in this crate retries on its own; callers decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::Status { status, .. } => *status >= 500 || *status == 429,
            Error::Core(_) | Error::InvalidUrl { .. } | Error::InvalidAccount(_) => false,
        }
    }
}
