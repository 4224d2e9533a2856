//! API error type and its HTTP mapping.
//!
//! Every handler returns `ApiError`; the response body is a small JSON
//! object whose `error` field is a stable machine-readable kind.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mealpass_core::Error;
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("missing or malformed bearer token")]
    Unauthorized,

    #[error("invalid credentials")]
    Forbidden,

    #[error("admin routes are disabled: no admin token configured")]
    AdminDisabled,

    #[error(transparent)]
    Core(#[from] Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::AdminDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Core(e) => match e {
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Blocked(_) => StatusCode::FORBIDDEN,
                Error::OutsideMealWindow => StatusCode::UNPROCESSABLE_ENTITY,
                Error::AlreadyScanned(_) => StatusCode::CONFLICT,
                Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                Error::Dependency(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "AUTH_REQUIRED",
            Self::Forbidden => "AUTH_FORBIDDEN",
            Self::AdminDisabled => "AUTH_DISABLED",
            Self::Core(e) => e.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
