//! # Sessions
//!
//! Typed session model and the resolver seam used to look up the caller's
//! session from an inbound request. Sessions are issued elsewhere; the
//! gateway only reads them.

use std::fmt;

use async_trait::async_trait;
use axum::http::{HeaderMap, header::COOKIE};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Bearer credential the backend issued at login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendToken(String);

impl BackendToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the outbound `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BackendToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackendToken([REDACTED])")
    }
}

/// Identity carried by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Absent for identities that never authenticated against the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_token: Option<BackendToken>,
}

/// A resolved caller session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
}

impl Session {
    /// The backend token embedded in this session, if any.
    pub fn backend_token(&self) -> Option<&BackendToken> {
        self.user.backend_token.as_ref()
    }
}

/// Resolves the session attached to an inbound request.
///
/// Absence of a valid session is a normal outcome, so implementations
/// return `None` instead of an error.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Option<Session>;
}

/// Resolves sessions from an HS256-signed JWT cookie.
pub struct JwtCookieSessionResolver {
    cookie_name: String,
    secure_cookie_name: String,
    key: DecodingKey,
    validation: Validation,
}

impl JwtCookieSessionResolver {
    pub fn new(cookie_name: impl Into<String>, secret: &[u8]) -> Self {
        let cookie_name = cookie_name.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        Self {
            secure_cookie_name: format!("__Secure-{cookie_name}"),
            cookie_name,
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    fn decode(&self, token: &str) -> Option<Session> {
        match decode::<Session>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(error) => {
                tracing::debug!(error = %error, "Rejected session cookie");
                None
            }
        }
    }
}

#[async_trait]
impl SessionResolver for JwtCookieSessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Option<Session> {
        let token = extract_cookie(headers, &self.secure_cookie_name)
            .or_else(|| extract_cookie(headers, &self.cookie_name))?;
        self.decode(&token)
    }
}

/// Returns the value of the named cookie across all `Cookie` headers.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
