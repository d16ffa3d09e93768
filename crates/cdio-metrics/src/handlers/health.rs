use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::warn;

use crate::router::ExporterState;

pub async fn health_live() -> impl IntoResponse {
    StatusCode::OK
}

/// Ready once the upstream instance answers its system info route.
pub async fn health_ready(State(state): State<Arc<ExporterState>>) -> impl IntoResponse {
    match state.gateway.get_system_info().await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            warn!(error = %err, "upstream not reachable, reporting not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
