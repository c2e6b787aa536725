use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            // Expected outcomes, not worth an error line.
            AppError::DuplicateEmail | AppError::InvalidInput(_) | AppError::NotFound | AppError::RateLimited => {
                tracing::debug!(error = %self, "Request rejected")
            }
            _ => tracing::error!(error = ?self, "Request failed"),
        }

        match self {
            // Says nothing about the existing entry beyond the fact that it exists.
            AppError::DuplicateEmail => error_resp(
                StatusCode::CONFLICT,
                ErrorCode::AlreadyEnrolled,
                Some("This email is already on the waitlist".into()),
            ),
            AppError::Persistence { .. } => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                Some("Something went wrong, please try again".into()),
            ),
            AppError::Notification(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::NotificationError,
                None,
            ),
            AppError::RateLimited => {
                error_resp(StatusCode::TOO_MANY_REQUESTS, ErrorCode::RateLimited, None)
            }
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::Internal(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, None)
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
