// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    // 400 Bad Request
    #[error("validation failed: {0}")]
    Validation(String),

    // 409 Conflict (email, phone, slug or exam/question pair already taken)
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    // 404 Not Found
    #[error("not found: {0}")]
    NotFound(String),

    // 400 Bad Request
    #[error("verification code does not match")]
    CodeMismatch,

    // 401 Unauthorized
    #[error("invalid credentials")]
    InvalidCredentials,

    // 401 Unauthorized (missing or malformed token)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    // 403 Forbidden
    #[error("account not activated")]
    NotActivated,

    // 403 Forbidden
    #[error("permission denied")]
    PermissionDenied,

    // 500, after the registration rollback has run
    #[error("mail delivery failed: {0}")]
    MailDelivery(String),

    // 500 Internal Server Error
    #[error("internal error: {0}")]
    InternalServerError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::CodeMismatch => StatusCode::BAD_REQUEST,
            AppError::DuplicateKey(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotActivated | AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::MailDelivery(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Maps a unique-constraint failure to `DuplicateKey` with the given
    /// message; every other database error becomes an internal error.
    pub fn unique_or_internal(err: sqlx::Error, message: impl Into<String>) -> Self {
        if is_unique_violation(&err) {
            AppError::DuplicateKey(message.into())
        } else {
            AppError::from(err)
        }
    }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::MailDelivery(msg) => {
                tracing::error!("Mail delivery failed: {}", msg);
                "Failed to send email.".to_string()
            }
            AppError::Validation(msg)
            | AppError::DuplicateKey(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg) => msg,
            AppError::CodeMismatch => "Invalid code".to_string(),
            AppError::InvalidCredentials => "Invalid credentials.".to_string(),
            AppError::NotActivated => "Account not activated.".to_string(),
            AppError::PermissionDenied => {
                "You do not have permission to perform this action.".to_string()
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            err if is_unique_violation(&err) => AppError::DuplicateKey(err.to_string()),
            err => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        assert_eq!(AppError::CodeMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DuplicateKey("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotActivated.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::MailDelivery("smtp down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
