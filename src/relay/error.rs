//! Relay error responses.

use crate::client::ClientError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The request cannot be forwarded as given.
    #[error("{0}")]
    BadRequest(String),

    /// The ML service could not be reached or answered with an error.
    #[error(transparent)]
    Upstream(#[from] ClientError),

    /// The Gemini call failed; the cause is logged, not returned.
    #[error("Failed to get explanation from Gemini API.")]
    Explanation(#[source] ClientError),
}

impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        RelayError::BadRequest(rejection.body_text())
    }
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_) | RelayError::Explanation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Explanation(cause) => warn!("Gemini request failed: {}", cause),
            other => warn!("Relay request failed: {}", other),
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}
