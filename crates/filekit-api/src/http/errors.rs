//! JSON error wrapper shared by every endpoint.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use filekit_pipeline::ProcessingError;
use serde::Serialize;

/// Error body returned to callers: `{"error": "<detail>"}`.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

/// Failure rendered as a status code plus [`ErrorBody`].
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    detail: String,
}

impl ApiError {
    const fn new(status: StatusCode, detail: String) -> Self {
        Self { status, detail }
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail.into())
    }

    /// Failure reported with an explicit status instead of the default 500.
    pub(crate) const fn rejected(status: StatusCode, detail: String) -> Self {
        Self::new(status, detail)
    }

    #[cfg(test)]
    pub(crate) fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        Self::internal(err.detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.detail };
        (self.status, Json(body)).into_response()
    }
}
