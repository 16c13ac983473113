use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::error::TaskError;

/// Error body shared by every failing endpoint: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody { pub error: String }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageBody { pub message: String }

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self { Self { status, message: message.into() } }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<TaskError> for ApiError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, "Task not found"),
            TaskError::Validation(message) => ApiError::new(StatusCode::BAD_REQUEST, message),
            TaskError::Io(_) | TaskError::Storage(_) => {
                tracing::error!(error = %e, "task storage failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to access task storage")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self { ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text()) }
}
