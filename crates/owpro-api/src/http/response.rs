//! Envelope response format for all API responses.
//!
//! Every JSON response is wrapped in a consistent envelope:
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 },
//!   "errors": []
//! }
//! ```

use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Envelope response wrapping all API data.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// The main response payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Request metadata.
    pub meta: ApiMeta,

    /// Error list (empty on success).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,

    /// HTTP status for the response; not serialized.
    #[serde(skip)]
    pub status: StatusCode,
}

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unique request identifier for tracing.
    pub request_id: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
}

/// Individual error detail.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Per-request id and clock for envelope metadata.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    start: Instant,
}

impl RequestMeta {
    pub fn start() -> Self {
        Self {
            request_id: uuid::Uuid::now_v7().to_string(),
            start: Instant::now(),
        }
    }

    fn into_meta(self) -> ApiMeta {
        ApiMeta {
            request_id: self.request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            response_time_ms: self.start.elapsed().as_millis() as u64,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response with data.
    pub fn success(data: T, meta: RequestMeta) -> Self {
        Self {
            data: Some(data),
            meta: meta.into_meta(),
            errors: Vec::new(),
            status: StatusCode::OK,
        }
    }
}

impl ApiResponse<()> {
    /// Create an error response (no data).
    pub fn error(
        status: StatusCode,
        code: &str,
        message: String,
        details: Option<serde_json::Value>,
        meta: RequestMeta,
    ) -> Self {
        Self {
            data: None,
            meta: meta.into_meta(),
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message,
                details,
            }],
            status,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = serde_json::to_string(&self).unwrap_or_else(|_| {
            r#"{"errors":[{"code":"SERIALIZATION_ERROR","message":"Failed to serialize response"}]}"#.to_string()
        });

        (
            self.status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
