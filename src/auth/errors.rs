use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::social::SocialAuthError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Missing required fields")]
    MissingFields,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("User with this email already exists")]
    EmailAlreadyExists,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,
    #[error("Refresh token not provided")]
    MissingRefreshToken,
    #[error("{0}")]
    PasswordValidation(String),
    #[error("{0}")]
    EmailValidation(String),
    #[error("{0}")]
    UsernameValidation(String),
    #[error(transparent)]
    Social(#[from] SocialAuthError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing error: {0}")]
    PasswordHashing(#[from] crate::auth::password::PasswordError),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeaderFormat
            | AuthError::MissingRefreshToken
            | AuthError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::MissingFields
            | AuthError::PasswordMismatch
            | AuthError::EmailAlreadyExists
            | AuthError::PasswordValidation(_)
            | AuthError::EmailValidation(_)
            | AuthError::UsernameValidation(_) => StatusCode::BAD_REQUEST,
            AuthError::Social(err) => err.status(),
            AuthError::Database(_) | AuthError::PasswordHashing(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::UserNotFound => "User not found",
            AuthError::MissingFields
            | AuthError::PasswordMismatch
            | AuthError::EmailAlreadyExists
            | AuthError::PasswordValidation(_)
            | AuthError::EmailValidation(_)
            | AuthError::UsernameValidation(_) => "Registration failed",
            AuthError::InvalidToken | AuthError::Jwt(_) => "Invalid token",
            AuthError::TokenExpired => "Token expired",
            AuthError::MissingAuthHeader => "Missing authorization header",
            AuthError::InvalidAuthHeaderFormat => "Invalid authorization header format",
            AuthError::MissingRefreshToken => "Refresh token not provided",
            AuthError::Social(_) => "Social login failed",
            AuthError::Database(_) => "Database error",
            AuthError::PasswordHashing(_) => "Password processing error",
            AuthError::Internal(_) => "Internal server error",
        };

        let message = match &self {
            AuthError::Database(err) => {
                tracing::error!("Auth database error: {}", err);
                "Internal server error.".to_string()
            }
            AuthError::PasswordHashing(err) => {
                tracing::error!("Password hashing error: {}", err);
                "Internal server error.".to_string()
            }
            AuthError::Internal(err) => {
                tracing::error!("Auth internal error: {:#}", err);
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "message": message,
        }));

        (status, body).into_response()
    }
}
