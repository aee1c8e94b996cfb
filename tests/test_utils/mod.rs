//! Shared helpers for gateway integration tests.

#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use console_gateway::{
    config::AppConfig,
    server::{AppState, create_app},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_SESSION_SECRET: &str = "integration-test-session-secret";
pub const TEST_BACKEND_TOKEN: &str = "backend-token-123";

/// Config pointing the gateway at `backend_url`.
pub fn test_config(backend_url: &str) -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        backend_url: backend_url.to_string(),
        backend_timeout_ms: 5_000,
        session_secret: Some(TEST_SESSION_SECRET.to_string()),
        ..AppConfig::default()
    }
}

/// Builds the full application router against `backend_url`.
pub fn test_app(backend_url: &str) -> Router {
    test_app_with(test_config(backend_url))
}

/// Builds the full application router from an adjusted `config`.
pub fn test_app_with(config: AppConfig) -> Router {
    let state = AppState::from_config(config).expect("app state builds");
    create_app(state)
}

/// `Cookie` header value carrying a signed session, with or without a backend token.
pub fn session_cookie(backend_token: Option<&str>) -> String {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs()
        + 3_600;

    let mut user = json!({
        "id": "admin-1",
        "email": "admin@sekolah.test",
        "role": "superadmin",
    });
    if let Some(token) = backend_token {
        user["backendToken"] = Value::String(token.to_string());
    }

    let jwt = encode(
        &Header::default(),
        &json!({ "user": user, "exp": exp }),
        &EncodingKey::from_secret(TEST_SESSION_SECRET.as_bytes()),
    )
    .expect("session token encodes");

    format!("console_session={jwt}")
}

pub fn authed_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("cookie", session_cookie(Some(TEST_BACKEND_TOKEN)))
        .body(Body::empty())
        .expect("request builds")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Drives one request through `app`, decoding the body as JSON (null when empty).
pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is JSON")
    };

    TestResponse {
        status,
        headers,
        body,
    }
}
