//! Handler errors and their JSON rendering.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by request handlers.
///
/// Every variant renders as `{"detail": "<message>"}` with a matching status.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request was understood but rejected.
    #[error("{0}")]
    BadRequest(String),

    /// Credentials did not match.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller lacks the required role.
    #[error("{0}")]
    Forbidden(String),

    /// The referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request body or parameters could not be parsed.
    #[error("{0}")]
    Unprocessable(String),

    /// Something failed on our side. The cause is logged, not returned.
    #[error("Internal server error")]
    Internal(#[source] crate::Error),
}

impl ApiError {
    /// The HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::InvalidInput(message) => Self::BadRequest(message),
            other => Self::Internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Unprocessable(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(source) = &self {
            error!(error = %source, "Request failed");
        }

        let status = self.status();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
