//! # Error Handling
//!
//! Unified error handling for the console gateway. Every failure a route can
//! produce is converted at the route boundary into an [`ApiError`], which
//! renders as `{"message", "code", "trace_id"}` with the appropriate status.

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry;

/// Message returned when no session could be resolved.
pub const NOT_LOGGED_IN_MESSAGE: &str = "Unauthorized - Not logged in";
/// Message returned when the session carries no backend token.
pub const NO_BACKEND_TOKEN_MESSAGE: &str = "Unauthorized - No backend token";

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Human-readable error message
    pub message: Box<str>,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code, code and message
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            trace_id: telemetry::current_trace_id().map(String::into_boxed_str),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        (self.status, headers, axum::Json(self)).into_response()
    }
}

/// Failures a forwarding route can produce.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No session could be resolved for the caller.
    #[error("Not logged in")]
    Unauthenticated,
    /// A session exists but carries no backend token.
    #[error("No backend token")]
    Unauthorized,
    /// The backend answered with a non-2xx status.
    #[error("backend responded with {status}: {message}")]
    Upstream { status: StatusCode, message: String },
    /// The backend could not be reached or returned an unreadable body.
    #[error("backend transport failure: {message}")]
    Transport { message: String },
    /// The inbound request could not be read.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The inbound body exceeded the configured upload limit.
    #[error("request body too large")]
    PayloadTooLarge,
}

impl GatewayError {
    /// Status code the caller sees for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated | GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Stable code for programmatic handling and log correlation.
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Unauthenticated => "UNAUTHENTICATED",
            GatewayError::Unauthorized => "NO_BACKEND_TOKEN",
            GatewayError::Upstream { .. } => "UPSTREAM_ERROR",
            GatewayError::Transport { .. } => "TRANSPORT_ERROR",
            GatewayError::InvalidRequest(_) => "VALIDATION_FAILED",
            GatewayError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        let status = error.status_code();
        let code = error.error_code();
        let message = match error {
            GatewayError::Unauthenticated => NOT_LOGGED_IN_MESSAGE.to_string(),
            GatewayError::Unauthorized => NO_BACKEND_TOKEN_MESSAGE.to_string(),
            GatewayError::Upstream { message, .. } | GatewayError::Transport { message } => message,
            GatewayError::InvalidRequest(message) => message,
            GatewayError::PayloadTooLarge => "Request body too large".to_string(),
        };

        Self::new(status, code, message)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return GatewayError::PayloadTooLarge;
        }

        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {err}"),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {err}"),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        GatewayError::InvalidRequest(message)
    }
}

impl From<MultipartError> for GatewayError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return GatewayError::PayloadTooLarge;
        }

        tracing::debug!(%error, "Failed to read multipart field");
        GatewayError::InvalidRequest("Invalid multipart form data".to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_and_unauthorized_are_distinct() {
        let unauthenticated = GatewayError::Unauthenticated.into_response();
        let unauthorized = GatewayError::Unauthorized.into_response();

        assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

        let first = body_json(unauthenticated).await;
        let second = body_json(unauthorized).await;
        assert_eq!(first["message"], NOT_LOGGED_IN_MESSAGE);
        assert_eq!(first["code"], "UNAUTHENTICATED");
        assert_eq!(second["message"], NO_BACKEND_TOKEN_MESSAGE);
        assert_eq!(second["code"], "NO_BACKEND_TOKEN");
    }

    #[tokio::test]
    async fn upstream_status_is_mirrored() {
        let response = GatewayError::Upstream {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "NPSN already registered".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["message"], "NPSN already registered");
        assert_eq!(body["code"], "UPSTREAM_ERROR");
    }

    #[test]
    fn transport_maps_to_internal_server_error() {
        let error: ApiError = GatewayError::Transport {
            message: "Failed to fetch sekolah".to_string(),
        }
        .into();

        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.code, Box::from("TRANSPORT_ERROR"));
        assert_eq!(error.message, Box::from("Failed to fetch sekolah"));
    }

    #[tokio::test]
    async fn trace_id_is_attached_inside_request_scope() {
        let error = telemetry::with_trace_context(
            telemetry::TraceContext {
                trace_id: "req-42".to_string(),
            },
            async { ApiError::from(GatewayError::Unauthenticated) },
        )
        .await;

        assert_eq!(error.trace_id.as_deref(), Some("req-42"));
    }

    #[test]
    fn from_anyhow_hides_details() {
        let api_error: ApiError = anyhow::anyhow!("connection reset by peer").into();

        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.message, Box::from("An internal error occurred"));
    }
}
