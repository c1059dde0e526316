use axum::{extract::State, http::StatusCode, Form};
use tracing::{error, instrument};

use crate::api::AppState;
use crate::errors::AppError;
use crate::queue::TaskEnvelope;

/// Push endpoint for externally queued tasks. Processes the envelope inline.
#[instrument(skip_all)]
pub async fn run_task(
    State(state): State<AppState>,
    Form(envelope): Form<TaskEnvelope>,
) -> Result<StatusCode, AppError> {
    match state.bot.handle_envelope(&envelope).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(e) => {
            error!(error = %e, "Task processing failed");
            Err(e)
        }
    }
}
