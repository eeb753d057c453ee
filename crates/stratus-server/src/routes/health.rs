//! Liveness endpoint.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Session store health as reported by `/ping`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreHealth {
    #[serde(rename = "store-type")]
    pub store_type: String,
    #[serde(rename = "store-up")]
    pub store_up: bool,
}

/// `/ping` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    #[serde(rename = "build-info")]
    pub build_info: String,
    #[serde(rename = "session-store-health")]
    pub session_store_health: StoreHealth,
}

/// Liveness check (no auth required). 500 when the session store is down.
pub async fn ping(State(state): State<AppState>) -> (StatusCode, Json<PingResponse>) {
    let store_up = state.store.check_health().await;
    let status = if store_up {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(PingResponse {
            status: "alive".to_string(),
            build_info: state.config.build_info.clone(),
            session_store_health: StoreHealth {
                store_type: state.store.kind().to_string(),
                store_up,
            },
        }),
    )
}

/// Create health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/ping", get(ping))
}
