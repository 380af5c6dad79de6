//! Error types for the observer server.
//!
//! [`ObserverError`] converts into an Axum response with a JSON body of
//! the form `{ "error": ..., "status": ... }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use trisolaris_core::SessionError;

/// Errors that can occur in the observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The session behind a world could not answer.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Session(SessionError::Closed(world)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("session for world {world} is not running"),
            ),
            Self::Session(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
