//! `Host` header guard.
//!
//! Requests whose host is not listed in `allowed_hosts` are rejected with
//! 400 before reaching any handler.

use axum::Json;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::AppState;

/// Hosts admitted when debugging with an empty list.
const DEBUG_HOSTS: [&str; 3] = [".localhost", "127.0.0.1", "[::1]"];

/// Host part of a `Host` header value: lowercased, without port or
/// trailing dot.
pub fn split_host(value: &str) -> &str {
    let value = value.trim();
    let host = if value.starts_with('[') {
        match value.find(']') {
            Some(end) => &value[..=end],
            None => value,
        }
    } else {
        value.rsplit_once(':').map_or(value, |(host, _)| host)
    };
    host.strip_suffix('.').unwrap_or(host)
}

/// Whether `host` matches one of the patterns. `*` matches anything and
/// a leading `.` matches the domain and all its subdomains.
pub fn host_allowed<S: AsRef<str>>(host: &str, patterns: &[S]) -> bool {
    let host = host.to_ascii_lowercase();
    patterns.iter().any(|pattern| {
        let pattern = pattern.as_ref().to_ascii_lowercase();
        if pattern == "*" {
            true
        } else if let Some(domain) = pattern.strip_prefix('.') {
            host == domain || host.ends_with(&pattern)
        } else {
            host == pattern
        }
    })
}

/// Middleware rejecting requests for hosts that are not allowed.
pub async fn allowed_hosts(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let raw = req
        .headers()
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())
        .unwrap_or_default()
        .to_string();
    let host = split_host(&raw);

    let settings = &state.settings;
    let allowed = if settings.allowed_hosts.is_empty() && settings.debug {
        host_allowed(host, &DEBUG_HOSTS)
    } else {
        host_allowed(host, &settings.allowed_hosts)
    };

    if allowed {
        return next.run(req).await;
    }

    tracing::warn!(host = %raw, "Rejected request for a host that is not allowed");
    let body = serde_json::json!({
        "error": {
            "category": "invalid_host",
            "message": format!("Invalid HTTP_HOST header: '{raw}'."),
        }
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
