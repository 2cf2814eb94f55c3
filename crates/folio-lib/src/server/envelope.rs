//! Response envelope.
//!
//! Successful payloads are normalized and sent as the JSON body. Failures
//! are sent as `{ "error": <message> }` with a status picked by
//! [`ApiError`]; they skip normalization.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::forms::FormError;
use crate::normalize::{Normalizer, Value};
use crate::store::Entity;

/// A normalized success response.
#[derive(Debug)]
pub struct Envelope {
    status: StatusCode,
    body: serde_json::Value,
}

impl Envelope {
    /// 200 with the normalized `payload`.
    pub fn ok(normalizer: &Normalizer, payload: &Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: normalizer.normalize(payload),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Request failures, each mapped to one status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 400: missing or invalid input.
    BadRequest(String),
    /// 401: no identity on a protected operation.
    Unauthorized,
    /// 404: the entity does not exist.
    NotFound(Entity),
    /// 500: generic message only; the cause has already been logged.
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Log `cause` server-side and return a 500 that carries only `message`.
    pub fn internal(message: impl Into<String>, cause: &dyn std::fmt::Display) -> Self {
        let message = message.into();
        tracing::error!(error = %cause, "{}", message);
        Self::Internal(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(message) | Self::Internal(message) => message.clone(),
            Self::Unauthorized => "Unauthorized".to_string(),
            Self::NotFound(entity) => format!("{} not found", entity.label()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status().as_u16(), self.message())
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use num_bigint::BigInt;

    async fn parts(resp: Response) -> (StatusCode, Option<String>, serde_json::Value) {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, content_type, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn success_body_is_normalized_json() {
        let payload = Value::record([("id", Value::BigInt(BigInt::from(12))), ("name", "Rust".into())]);
        let envelope = Envelope::ok(&Normalizer::default(), &payload);
        assert_eq!(envelope.status(), StatusCode::OK);

        let (status, content_type, body) = parts(envelope.into_response()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, json!({ "id": "12", "name": "Rust" }));
    }

    #[tokio::test]
    async fn errors_map_to_status_and_message() {
        let cases = [
            (ApiError::bad_request("name is required"), StatusCode::BAD_REQUEST, "name is required"),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED, "Unauthorized"),
            (ApiError::NotFound(Entity::WorkExperience), StatusCode::NOT_FOUND, "Work experience not found"),
            (ApiError::Internal("Failed to fetch skills".into()), StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch skills"),
        ];
        for (err, expected_status, expected_message) in cases {
            let (status, content_type, body) = parts(err.into_response()).await;
            assert_eq!(status, expected_status);
            assert_eq!(content_type.as_deref(), Some("application/json"));
            assert_eq!(body, json!({ "error": expected_message }));
        }
    }

    #[test]
    fn internal_error_hides_the_cause() {
        let cause = std::io::Error::other("disk on fire at /var/lib/folio.db");
        let err = ApiError::internal("Failed to update skill", &cause);
        assert_eq!(err.message(), "Failed to update skill");
        assert!(!err.to_string().contains("disk on fire"));
    }

    #[test]
    fn form_errors_become_bad_requests() {
        let err = ApiError::from(FormError::Missing("period"));
        assert_eq!(err, ApiError::BadRequest("period is required".into()));
    }
}
