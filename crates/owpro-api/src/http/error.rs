//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use owpro_types::llm::RouteError;

use crate::http::response::{ApiResponse, RequestMeta};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Routing failed.
    Route(RouteError),
    /// Malformed request body.
    Validation(String),
}

impl From<RouteError> for AppError {
    fn from(e: RouteError) -> Self {
        AppError::Route(e)
    }
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Route(RouteError::ModelNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "MODEL_NOT_FOUND")
            }
            AppError::Route(RouteError::ContextLengthExceeded { .. }) => {
                (StatusCode::BAD_REQUEST, "CONTEXT_LENGTH_EXCEEDED")
            }
            AppError::Route(RouteError::InvalidRequest(_)) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Route(RouteError::Provider { .. }) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR")
            }
            AppError::Route(RouteError::ProviderUnavailable { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE")
            }
            AppError::Route(RouteError::AllProvidersExhausted { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ALL_PROVIDERS_EXHAUSTED")
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Route(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Route(RouteError::AllProvidersExhausted { attempts }) => {
                serde_json::to_value(attempts).ok()
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::warn!(code, error = %self.message(), "Request failed");
        }
        ApiResponse::error(status, code, self.message(), self.details(), RequestMeta::start())
            .into_response()
    }
}
