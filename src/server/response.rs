//! Mapping crate errors onto HTTP responses.

use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

impl Error {
    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::TaskNotFound(_) | Self::LinkNotFound(_) | Self::DataFileMissing(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::InvalidDataFile { .. }
            | Self::AuthNotConfigured
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Unauthorized => (status, "Unauthorized").into_response(),
            Self::InvalidPayload(details) => {
                (status, Json(json!({"error": "invalid_payload", "details": details})))
                    .into_response()
            }
            Self::TaskNotFound(_) => (status, Json(json!({"error": "Task not found"}))).into_response(),
            Self::LinkNotFound(_) => (status, Json(json!({"error": "Link not found"}))).into_response(),
            Self::DataFileMissing(_) => {
                (status, Json(json!({"error": "Data file not found"}))).into_response()
            }
            Self::AuthNotConfigured => {
                tracing::error!("login attempted without AUTH_PASSWORD_HASH and AUTH_COOKIE_SECRET");
                (status, Json(json!({"error": "Auth not configured"}))).into_response()
            }
            other => {
                tracing::error!(error = %other, "request failed");
                let body = json!({"error": "Failed to access data file", "details": other.to_string()});
                (status, Json(body)).into_response()
            }
        }
    }
}
