//! Response normalization.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::warn;

use super::client::TransportError;
use crate::error::GatewayError;

/// A backend answer as received: status plus decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl BackendResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl IntoResponse for BackendResponse {
    fn into_response(self) -> Response {
        if self.status == StatusCode::NO_CONTENT {
            return self.status.into_response();
        }

        (self.status, Json(self.body)).into_response()
    }
}

/// Pulls a human-readable message out of a backend error body.
///
/// Looks at `message` (string, or array of strings joined with ", ") and then
/// at `error` (string, or object with a `message`). Blank values are ignored.
pub fn extract_message(body: &Value) -> Option<String> {
    let from_message = match body.get("message") {
        Some(Value::String(message)) => Some(message.trim().to_string()),
        Some(Value::Array(messages)) => Some(
            messages
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
    .filter(|m| !m.is_empty());

    from_message.or_else(|| {
        match body.get("error") {
            Some(Value::String(error)) => Some(error.trim().to_string()),
            Some(Value::Object(error)) => error
                .get("message")
                .and_then(Value::as_str)
                .map(|m| m.trim().to_string()),
            _ => None,
        }
        .filter(|m| !m.is_empty())
    })
}

/// Normalizes a forwarding outcome.
///
/// 2xx responses pass through verbatim. Any other status becomes an upstream
/// error with the same status and the backend's message (or `fallback`).
/// Transport failures become a 500 carrying only `fallback`.
pub fn normalize(
    outcome: Result<BackendResponse, TransportError>,
    fallback: &str,
) -> Result<BackendResponse, GatewayError> {
    match outcome {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(GatewayError::Upstream {
            status: response.status,
            message: extract_message(&response.body).unwrap_or_else(|| fallback.to_string()),
        }),
        Err(error) => {
            warn!(kind = error.kind(), error = %error, fallback, "Forwarding failed in transport");
            Err(GatewayError::Transport {
                message: fallback.to_string(),
            })
        }
    }
}
