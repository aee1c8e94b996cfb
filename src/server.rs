//! # Server Configuration
//!
//! Router assembly and startup for the console gateway.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::get,
};
use thiserror::Error;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::backend::BackendClient;
use crate::config::{AppConfig, ConfigError};
use crate::handlers;
use crate::resources::{Catalog, default_catalog};
use crate::session::{JwtCookieSessionResolver, SessionResolver};
use crate::telemetry;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: BackendClient,
    pub sessions: Arc<dyn SessionResolver>,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Wires the backend client, cookie session resolver and default catalog from `config`.
    pub fn from_config(config: AppConfig) -> Result<Self, ServerError> {
        let origin = config.backend_origin()?;
        let backend = BackendClient::new(origin, config.backend_timeout())?;

        let secret = config
            .effective_session_secret()
            .ok_or(ConfigError::MissingSessionSecret)?;
        let sessions: Arc<dyn SessionResolver> = Arc::new(JwtCookieSessionResolver::new(
            config.session_cookie_name.clone(),
            secret.as_bytes(),
        ));

        Ok(Self {
            config: Arc::new(config),
            backend,
            sessions,
            catalog: Arc::new(default_catalog()),
        })
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build backend http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("invalid server address: {0}")]
    InvalidBindAddr(#[from] std::net::AddrParseError),
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/api", handlers::resource_router(&state.catalog))
        .layer(body_limit)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(telemetry::trace_context_middleware))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            telemetry::REQUEST_ID_HEADER,
        ])
        .expose_headers([telemetry::REQUEST_ID_HEADER])
        .allow_credentials(true)
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig) -> Result<(), ServerError> {
    let addr = config.bind_addr()?;
    let profile = config.profile.clone();
    let backend_url = config.backend_url.clone();

    let state = AppState::from_config(config)?;
    let families = state.catalog.len();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(ServerError::Bind)?;
    info!(%addr, profile = %profile, backend_url = %backend_url, families, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::HealthResponse,
            crate::error::ApiError,
            crate::pagination::PageMeta,
        )
    ),
    info(
        title = "Console Gateway API",
        description = "Authenticated forwarding layer between the admin console and the school platform backend",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
