//! Identity check for write endpoints.
//!
//! A request carries an identity when it presents the configured API key,
//! either in `X-API-Key` or as `Authorization: Bearer <key>`. Without a
//! configured key no identity can be established, so every write is refused.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::envelope::ApiError;
use super::AppState;

/// Header name used to carry the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Axum middleware that rejects requests without an identity with 401.
///
/// Runs before the handler, so a rejected request never touches storage.
pub async fn require_identity(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    validate_api_key(state.api_key.as_deref(), req, next).await
}

/// Core validation logic, separated for testability.
async fn validate_api_key(expected_key: Option<&str>, req: Request, next: Next) -> Response {
    if has_identity(expected_key, req.headers()) {
        return next.run(req).await;
    }
    if expected_key.is_none() {
        tracing::warn!("write rejected: no API key configured");
    } else {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "Unauthorized request: invalid or missing API key"
        );
    }
    ApiError::Unauthorized.into_response()
}

/// Whether `headers` present `expected_key`.
pub fn has_identity(expected_key: Option<&str>, headers: &HeaderMap) -> bool {
    match expected_key {
        Some(expected) if !expected.is_empty() => {
            provided_key(headers).is_some_and(|key| key == expected)
        }
        _ => false,
    }
}

fn provided_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key.trim());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}
