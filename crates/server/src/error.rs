//! API error taxonomy and its HTTP mapping.
//!
//! Lifecycle services never let a raw storage error reach the boundary;
//! everything is translated into one of these variants. "Not found" and
//! "belongs to someone else" are deliberately the same variant so the API
//! never reveals whether an id exists under another account.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use farmstead_core::Task;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    /// No `Authorization` header at all.
    #[error("access denied: no token provided")]
    MissingCredentials,

    /// Present but unverifiable token.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Bad login or password re-entry.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Field delete blocked by tasks that still reference it.
    #[error("field cannot be deleted: {} task(s) reference it", tasks.len())]
    DependentTasks { tasks: Vec<Task> },

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingCredentials => StatusCode::FORBIDDEN,
            ApiError::InvalidToken | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::DependentTasks { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_unique_violation() {
            return ApiError::Conflict("duplicate value for a unique column".to_string());
        }
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::DependentTasks { tasks } => {
                json!({ "message": self.to_string(), "tasks": tasks })
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "unexpected server error");
                // Full detail stays in the server logs only.
                json!({ "message": "internal server error" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::MissingCredentials.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::DependentTasks { tasks: vec![] }.status(),
            StatusCode::CONFLICT
        );
    }
}
