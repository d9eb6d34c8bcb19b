//! Authentication for the xaas-admin site.
//!
//! Provides:
//! - [`AuthenticatedUser`]: identity of the administrator behind a request
//! - [`TokenValidator`]: trait for async token validation
//! - [`StaticTokenValidator`]: validator backed by the token grants in settings
//! - [`AuthLayer`] / [`AuthService`]: Tower middleware parameterised over `TokenValidator`
//! - [`AuthConfig`]: configuration for the auth layer
//! - [`AuthError`]: auth-specific error types

mod error;
mod middleware;
mod user;
mod validator;

pub use error::AuthError;
pub use middleware::{AuthLayer, AuthService};
pub use user::{AuthenticatedUser, user_from_parts, username_from_parts};
pub use validator::StaticTokenValidator;

use xaas_core::settings::AuthSettings;

/// Configuration for the auth middleware.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// Whether authentication is enabled. When false, all requests pass through.
    pub enabled: bool,
    /// Group an administrator must belong to. `None` admits any
    /// authenticated user.
    pub required_group: Option<String>,
}

impl From<&AuthSettings> for AuthConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            enabled: settings.enabled,
            required_group: settings.required_group.clone(),
        }
    }
}

/// Trait for validating tokens and extracting user identity.
///
/// The middleware calls `validate()` with the bearer token and checks the
/// required group itself.
pub trait TokenValidator: Send + Sync + 'static {
    /// Validate a token and return the authenticated user.
    fn validate(
        &self,
        token: &str,
        config: &AuthConfig,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>,
    >;
}
