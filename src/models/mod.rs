//! # Data Models
//!
//! Response shapes owned by the gateway itself. Forwarded resource bodies are
//! relayed as opaque JSON and have no model here.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "console-gateway".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Liveness / readiness probe response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when live, `ready` when able to serve traffic
    pub status: String,
    /// Number of forwarded resource families mounted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub families: Option<usize>,
}
