//! Authenticated user identity and extraction helpers.

/// The administrator behind a request.
///
/// Stored in HTTP request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Login name, recorded in the audit log.
    pub username: String,
    /// Groups the user belongs to.
    pub groups: Vec<String>,
}

impl AuthenticatedUser {
    /// Whether the user belongs to `group`.
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Extract the `AuthenticatedUser` from HTTP request `Parts`, if present.
pub fn user_from_parts(parts: &http::request::Parts) -> Option<&AuthenticatedUser> {
    parts.extensions.get::<AuthenticatedUser>()
}

/// The username for audit logging.
///
/// Returns `"anonymous"` if no authenticated user is present (auth disabled).
pub fn username_from_parts(parts: &http::request::Parts) -> &str {
    user_from_parts(parts)
        .map(|u| u.username.as_str())
        .unwrap_or("anonymous")
}
