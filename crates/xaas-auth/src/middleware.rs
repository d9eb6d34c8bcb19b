//! Tower authentication middleware.
//!
//! `AuthLayer` and `AuthService` wrap the admin router with token validation
//! and the administrators-group check.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::Request;
use tower::{Layer, Service};

use crate::{AuthConfig, AuthError, AuthenticatedUser, TokenValidator};

/// Tower `Layer` that wraps services with token authentication.
#[derive(Clone)]
pub struct AuthLayer<V: TokenValidator> {
    validator: Arc<V>,
    config: AuthConfig,
}

impl<V: TokenValidator> AuthLayer<V> {
    /// Create a new auth layer with the given validator and config.
    pub fn new(validator: Arc<V>, config: AuthConfig) -> Self {
        Self { validator, config }
    }
}

impl<V: TokenValidator, S> Layer<S> for AuthLayer<V> {
    type Service = AuthService<V, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}

/// Tower `Service` that validates tokens before forwarding requests.
///
/// On success, inserts `AuthenticatedUser` into request extensions where
/// handlers pick it up for audit logging.
#[derive(Clone)]
pub struct AuthService<V: TokenValidator, S> {
    inner: S,
    validator: Arc<V>,
    config: AuthConfig,
}

impl<V, S> Service<Request<Body>> for AuthService<V, S>
where
    V: TokenValidator,
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let validator = self.validator.clone();
        let config = self.config.clone();

        Box::pin(async move {
            if !config.enabled {
                let resp = inner
                    .call(req)
                    .await
                    .unwrap_or_else(|infallible| match infallible {});
                return Ok(resp.into_response());
            }

            let Some(token) = extract_bearer_token(&req).map(str::to_string) else {
                return Ok(error_response(&AuthError::MissingToken));
            };

            let user = match validator.validate(&token, &config).await {
                Ok(user) => user,
                Err(auth_err) => {
                    tracing::warn!("Authentication failed: {auth_err}");
                    return Ok(error_response(&auth_err));
                }
            };

            if let Err(auth_err) = authorize(&user, &config) {
                tracing::warn!("Authorization failed: {auth_err}");
                return Ok(error_response(&auth_err));
            }

            tracing::debug!(user = %user.username, "Authenticated request");
            req.extensions_mut().insert(user);
            let resp = inner
                .call(req)
                .await
                .unwrap_or_else(|infallible| match infallible {});
            Ok(resp.into_response())
        })
    }
}

/// Check the required group, if any.
fn authorize(user: &AuthenticatedUser, config: &AuthConfig) -> Result<(), AuthError> {
    match &config.required_group {
        Some(group) if !user.is_member_of(group) => Err(AuthError::Forbidden {
            username: user.username.clone(),
            group: group.clone(),
        }),
        _ => Ok(()),
    }
}

/// Extract bearer token from the Authorization header.
fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

/// Build a 401 or 403 JSON response. 401 responses carry a
/// `WWW-Authenticate` challenge.
fn error_response(err: &AuthError) -> axum::response::Response {
    let category = if err.is_client_error() {
        "authentication"
    } else {
        "authorization"
    };
    let body = serde_json::json!({
        "error": {
            "category": category,
            "message": err.to_string(),
        }
    });

    let mut response = (err.status(), axum::Json(body)).into_response();
    if err.is_client_error() {
        response.headers_mut().insert(
            http::header::WWW_AUTHENTICATE,
            http::HeaderValue::from_static(r#"Bearer realm="xaas-admin""#),
        );
    }
    response
}
