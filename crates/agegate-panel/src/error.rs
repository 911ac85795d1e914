//! Error types for the panel API.
//!
//! [`PanelError`] converts into an Axum response with a JSON body of the
//! form `{ "error": "...", "status": 503 }`.

use agegate_core::ControllerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the panel API layer.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// The controller is no longer running.
    #[error("controller unavailable: {0}")]
    Controller(#[from] ControllerError),

    /// The request was well-formed JSON but not acceptable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Controller(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
