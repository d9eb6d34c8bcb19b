//! Auth-specific error types.

use http::StatusCode;

/// Errors that can occur during authentication.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header or bearer token present.
    #[error("missing authentication token")]
    MissingToken,

    /// The token is not known to the validator.
    #[error("invalid authentication token")]
    InvalidToken,

    /// The user is authenticated but not in the administrators group.
    #[error("user '{username}' is not a member of '{group}'")]
    Forbidden { username: String, group: String },
}

impl AuthError {
    /// Whether this error should result in a 401 (vs. a 403).
    pub fn is_client_error(&self) -> bool {
        matches!(self, AuthError::MissingToken | AuthError::InvalidToken)
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }
}
