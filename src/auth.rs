//! # Authentication
//!
//! Turns the caller's session into the backend credential every forwarded
//! call needs, keeping "not logged in" and "logged in without a backend
//! token" apart.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::error::GatewayError;
use crate::server::AppState;
use crate::session::{BackendToken, Session, SessionResolver};

impl FromRef<AppState> for Arc<dyn SessionResolver> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.sessions)
    }
}

/// Extracts the backend token from an optional session.
///
/// A missing session fails with [`GatewayError::Unauthenticated`]; a session
/// without an embedded token fails with [`GatewayError::Unauthorized`].
pub fn extract_token(session: Option<&Session>) -> Result<BackendToken, GatewayError> {
    let session = session.ok_or(GatewayError::Unauthenticated)?;
    session
        .backend_token()
        .cloned()
        .ok_or(GatewayError::Unauthorized)
}

/// Extractor yielding the caller's backend credential.
#[derive(Debug, Clone)]
pub struct BackendAuth {
    pub user_id: String,
    pub token: BackendToken,
}

impl<S> FromRequestParts<S> for BackendAuth
where
    Arc<dyn SessionResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = Arc::<dyn SessionResolver>::from_ref(state);
        let session = resolver.resolve(&parts.headers).await;

        match extract_token(session.as_ref()) {
            Ok(token) => {
                let user_id = session.map(|s| s.user.id).unwrap_or_default();
                tracing::debug!(user_id = %user_id, "Resolved backend credential");
                Ok(Self { user_id, token })
            }
            Err(error) => {
                tracing::info!(
                    code = error.error_code(),
                    path = %parts.uri.path(),
                    "Rejected request without backend credential"
                );
                Err(error)
            }
        }
    }
}
