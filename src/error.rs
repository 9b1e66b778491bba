use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::routes::user::RepositoryError;
use crate::session::SessionError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid submission")]
    InvalidSubmission,

    #[error("invalid email")]
    InvalidEmail,

    #[error("email already taken")]
    EmailTaken,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("no active session")]
    NoSession,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail => AppError::EmailTaken,
            err => AppError::Repository(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidSubmission => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                "Invalid submission",
            ),
            AppError::InvalidEmail => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                "Invalid email",
            ),
            AppError::EmailTaken => (StatusCode::OK, error_codes::USER_EXISTS, "Email already taken"),
            AppError::AuthenticationFailed => (
                StatusCode::OK,
                error_codes::AUTH_FAILED,
                "Authentication failed",
            ),
            AppError::NoSession => (StatusCode::OK, error_codes::NO_SESSION, "No active session"),
            AppError::Session(_) | AppError::Repository(_) | AppError::PasswordHash(_) => {
                tracing::error!("request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "Error",
                )
            }
        };

        (status, error_to_api_response::<()>(code, message.to_string())).into_response()
    }
}
