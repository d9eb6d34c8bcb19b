//! Error types for xaas-api

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

/// Result type alias for xaas-api operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur in xaas-api
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// Error from xaas-core or the store
    #[error(transparent)]
    Core(#[from] xaas_core::Error),

    /// No model registered under this app label and slug
    #[error("Unknown model: {app_label}.{model_name}")]
    UnknownModel {
        /// Requested app label
        app_label: String,
        /// Requested model slug
        model_name: String,
    },

    /// A model was registered twice
    #[error("Model already registered: {0}")]
    AlreadyRegistered(String),

    /// Request body does not describe a record of the model
    #[error("Invalid {model} payload: {message}")]
    Payload {
        /// Model verbose name
        model: String,
        /// Deserialization failure
        message: String,
    },

    /// The key in the body differs from the key in the URL
    #[error("Key in body '{body}' does not match key in URL '{path}'")]
    KeyMismatch {
        /// Key from the URL
        path: String,
        /// Key from the body
        body: String,
    },

    /// Listener or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status and error category for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        use xaas_core::Error as Core;

        match self {
            ApiError::Core(Core::Validation { .. }) | ApiError::Payload { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation")
            }
            ApiError::Core(Core::NotFound { .. }) | ApiError::UnknownModel { .. } => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Core(Core::Conflict { .. }) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Core(Core::Integrity { .. }) => (StatusCode::CONFLICT, "integrity"),
            ApiError::Core(Core::InvalidKey { .. }) | ApiError::KeyMismatch { .. } => {
                (StatusCode::BAD_REQUEST, "invalid_key")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category) = self.status();
        let message = if status.is_server_error() {
            tracing::error!("Request failed: {self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = serde_json::json!({
            "error": {
                "category": category,
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}
