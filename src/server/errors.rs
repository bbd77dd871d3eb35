//! HTTP error responses
//!
//! Every failure is reported as `{"error": {"kind": .., "message": ..}}`
//! with a status derived from where the failure came from.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::NotesError;
use crate::config::ConfigError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    #[inline]
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl From<NotesError> for ApiError {
    #[inline]
    fn from(error: NotesError) -> Self {
        let (status, kind) = match &error {
            NotesError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            NotesError::Api {
                status: 401 | 403, ..
            } => (StatusCode::UNAUTHORIZED, "unauthorized"),
            NotesError::Api { .. }
            | NotesError::Network(_)
            | NotesError::Embedding(_)
            | NotesError::Index(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            NotesError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            NotesError::Io(_) | NotesError::Other(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        Self::new(status, kind, error.to_string())
    }
}

impl From<ConfigError> for ApiError {
    #[inline]
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::MissingApiKey => {
                Self::new(StatusCode::UNAUTHORIZED, "unauthorized", error.to_string())
            }
            other => NotesError::from(other).into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    #[inline]
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            rejection.body_text(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed ({}): {}", self.status, self.message);

        let body = Json(json!({
            "error": {
                "kind": self.kind,
                "message": self.message,
            }
        }));

        (self.status, body).into_response()
    }
}
