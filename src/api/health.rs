use axum::{extract::State, Json};
use serde::Serialize;
use chrono::Utc;

use crate::api::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub queue_running: bool,
    pub pending_tasks: usize,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let queue_running = state.queue.is_running();

    Json(ReadinessResponse {
        ready: queue_running,
        queue_running,
        pending_tasks: state.queue.pending(),
    })
}
