//! Error types for xaas-core.

use std::path::{Path, PathBuf};

/// Errors raised while validating, storing or configuring records.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A record failed field validation.
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation, if known
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// No record exists under the given key.
    #[error("{model} not found: {key}")]
    NotFound {
        /// Model verbose name
        model: String,
        /// Key that was looked up
        key: String,
    },

    /// A uniqueness constraint rejected the write.
    #[error("{model} already exists: {message}")]
    Conflict {
        /// Model verbose name
        model: String,
        /// Constraint details
        message: String,
    },

    /// A foreign-key constraint rejected the write.
    #[error("Integrity error: {message}")]
    Integrity {
        /// Constraint details
        message: String,
    },

    /// A key from a URL or command line does not fit the model's key type.
    #[error("Invalid key for {model}: '{key}'")]
    InvalidKey {
        /// Model verbose name
        model: String,
        /// Raw key
        key: String,
    },

    /// Database error not covered by a constraint variant.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error tied to a file path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience `Result` type alias for xaas-admin operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether the error was caused by the caller's input rather than
    /// by the service itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. }
                | Error::NotFound { .. }
                | Error::Conflict { .. }
                | Error::Integrity { .. }
                | Error::InvalidKey { .. }
                | Error::Serialization(_)
        )
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found<M: Into<String>, K: ToString>(model: M, key: K) -> Self {
        Error::NotFound {
            model: model.into(),
            key: key.to_string(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path that caused it.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
