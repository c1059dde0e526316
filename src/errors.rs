use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Webhook signature missing or invalid")]
    InvalidSignature,

    #[error("Task data is missing")]
    MissingTaskData,

    #[error("Task data is not valid base64: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Queue full - server overloaded")]
    QueueFull,

    #[error("Task queue is closed")]
    QueueClosed,

    #[error("Page fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Reply API returned {status}: {body}")]
    ReplyError { status: u16, body: String },
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        use axum::Json;

        let status = match &self {
            AppError::InvalidSignature
            | AppError::MissingTaskData
            | AppError::Base64Error(_)
            | AppError::SerdeError(_) => StatusCode::BAD_REQUEST,
            AppError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
            AppError::FetchTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::HttpError(_) | AppError::ReplyError { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": "webhook_error"
            }
        });

        (status, Json(body)).into_response()
    }
}
