//! Error types for adsight-core

use thiserror::Error;

/// Result type alias for adsight-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in adsight-core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A dot-path was empty or contained an empty segment.
    #[error("invalid settings path '{path}': {reason}")]
    InvalidPath {
        /// The rejected input
        path: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// A setting value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The value stored at a path does not have the setting's type.
    #[error("type mismatch at '{path}': {message}")]
    TypeMismatch {
        /// Path of the offending value
        path: String,
        /// Deserializer message
        message: String,
    },

    /// A write targeted an account the cache is not bound to.
    #[error("account '{0}' is not the active account")]
    InactiveAccount(String),
}

impl Error {
    /// Creates an invalid-path error.
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// Creates a type-mismatch error.
    pub fn type_mismatch(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TypeMismatch {
            path: path.into(),
            message: message.into(),
        }
    }
}
