use crate::store::StoreError;
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;

/// Everything a handler can fail with. Each variant maps to one status
/// code; the body is always a JSON `{message}` and nothing else crosses
/// the boundary.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input, including bad credentials at login.
    Validation(String),
    /// No usable bearer token.
    Unauthorized(String),
    /// Authenticated but not allowed to touch the requested fields.
    Forbidden(String),
    /// Task absent or invisible to the caller — deliberately the same.
    NotFound(String),
    /// A referenced user does not exist.
    InvalidReference(String),
    /// Storage or other unexpected failure. Detail stays in the logs.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message a caller is allowed to see. Internal details never leave
    /// the process.
    pub fn public_message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::InvalidReference(m) => m,
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(%detail, "request failed");
        }
        let body = json!({ "message": self.public_message() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.public_message())
    }
}

// ── Tests ──────────────────────────────────────────────────────
