use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required upstream (results, weather, standings, next-race schedule)
    /// returned a non-success status or a malformed body. Fatal to the
    /// in-progress assembly; nothing is cached or persisted.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// No cached and no persisted record for the current race. The caller
    /// should trigger an update, not retry the read.
    #[error("Race not yet ingested: {0}")]
    NotYetIngested(String),

    /// A store insert/update did not return the expected confirmation.
    /// Reported up, never retried automatically.
    #[error("Store write unacknowledged: {0}")]
    StoreWriteUnacknowledged(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::NotYetIngested(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StoreWriteUnacknowledged(msg) => {
                tracing::error!("Store write unacknowledged: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}
