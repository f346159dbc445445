//! Authentication failures and their HTTP mapping

use super::password::PasswordError;
use super::repository::RepositoryError;
use crate::error::ApiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use escape_core::TokenError;
use thiserror::Error;

/// Everything that can go wrong on the login, refresh and gate paths
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingAuthHeader,

    #[error("Invalid authorization format")]
    InvalidAuthFormat,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found or inactive")]
    UserNotFoundOrInactive,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("User store unavailable: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password check failed: {0}")]
    Password(#[from] PasswordError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthFormat
            | AuthError::InvalidCredentials
            | AuthError::UserNotFoundOrInactive => StatusCode::UNAUTHORIZED,
            AuthError::Token(e) if e.is_rejection() => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Token(_) | AuthError::Repository(_) | AuthError::Password(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match status {
            StatusCode::UNAUTHORIZED => ApiError::unauthorized(self.to_string()),
            StatusCode::FORBIDDEN => ApiError::forbidden(self.to_string()),
            StatusCode::BAD_REQUEST => ApiError::bad_request(self.to_string()),
            _ => {
                tracing::error!(error = %self, "authentication backend failure");
                ApiError::internal_error()
            }
        };

        body.into_response_with(status)
    }
}
