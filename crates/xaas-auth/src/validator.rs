//! Token validation against the grants listed in settings.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use xaas_core::settings::TokenGrant;

use crate::{AuthConfig, AuthError, AuthenticatedUser, TokenValidator};

/// Accepts the tokens granted in the `[auth]` settings section.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    users: HashMap<String, AuthenticatedUser>,
}

impl StaticTokenValidator {
    /// Build from configured grants. A later grant for the same token wins.
    pub fn new(grants: &[TokenGrant]) -> Self {
        let users = grants
            .iter()
            .map(|grant| {
                (
                    grant.token.clone(),
                    AuthenticatedUser {
                        username: grant.username.clone(),
                        groups: grant.groups.clone(),
                    },
                )
            })
            .collect();
        Self { users }
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no token is known.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(
        &self,
        token: &str,
        _config: &AuthConfig,
    ) -> Pin<Box<dyn Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>> {
        let user = self.users.get(token).cloned();
        Box::pin(async move { user.ok_or(AuthError::InvalidToken) })
    }
}
