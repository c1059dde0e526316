pub mod callback;
pub mod health;
pub mod task;

use axum::{Router, routing::{get, post}};
use std::sync::Arc;
use crate::bot::Bot;
use crate::config::Config;
use crate::queue::TaskQueue;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue:  TaskQueue,
    pub bot:    Arc<Bot>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/callback",     post(callback::webhook_callback))
        .route("/task",         post(task::run_task))
        .route("/health",       get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .with_state(state)
}
