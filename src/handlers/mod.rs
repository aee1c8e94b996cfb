//! # API Handlers
//!
//! Operational endpoints plus the generic forwarding handler mounted for
//! every resource route.

use axum::{extract::State, response::Json};

use crate::models::{HealthResponse, ServiceInfo};
use crate::server::AppState;

pub mod forward;

pub use forward::resource_router;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse)
    ),
    tag = "operations"
)]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        families: None,
    })
}

/// Readiness probe; ready once the resource catalog is mounted
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Gateway is ready to forward", body = HealthResponse)
    ),
    tag = "operations"
)]
pub async fn readyz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready".to_string(),
        families: Some(state.catalog.len()),
    })
}
