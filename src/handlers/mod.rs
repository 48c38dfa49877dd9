pub mod transactions;

use crate::gateway::GatewayMode;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub store: String,
    pub charge_mode: GatewayMode,
    pub credit_mode: GatewayMode,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store_status = match state.repository.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the store");
            "disconnected"
        }
    };

    let gateway = state.orchestrator.gateway();
    let health_response = HealthStatus {
        status: if store_status == "connected" {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store_status.to_string(),
        charge_mode: gateway.charge_mode(),
        credit_mode: gateway.credit_mode(),
    };

    // Return 503 if the store is down, 200 otherwise
    let status_code = if store_status == "connected" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
