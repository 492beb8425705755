use axum::http::StatusCode;
use thiserror::Error;

use super::AppError;

/// Errors related to user registration and authentication
#[derive(Error, Debug)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Username, email, or mobile number already registered")]
    DuplicateIdentity,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Internal server error: {message}")]
    InternalServerError { message: String },
}

impl AppError for UserError {
    fn status_code(&self) -> StatusCode {
        match self {
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::DuplicateIdentity => StatusCode::BAD_REQUEST,
            UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            UserError::AccountDisabled => StatusCode::FORBIDDEN,
            UserError::TokenExpired | UserError::InvalidToken => StatusCode::UNAUTHORIZED,
            UserError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            UserError::NotFound => "User not found".to_string(),
            UserError::DuplicateIdentity => {
                "Username, email, or mobile number already registered".to_string()
            }
            UserError::InvalidCredentials => "Incorrect credentials".to_string(),
            UserError::AccountDisabled => "Account is disabled".to_string(),
            UserError::TokenExpired => "Token has expired".to_string(),
            UserError::InvalidToken => "Could not validate credentials".to_string(),
            UserError::InternalServerError { .. } => "An internal error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            UserError::NotFound => "USER_NOT_FOUND",
            UserError::DuplicateIdentity => "USER_DUPLICATE_IDENTITY",
            UserError::InvalidCredentials => "USER_INVALID_CREDENTIALS",
            UserError::AccountDisabled => "USER_ACCOUNT_DISABLED",
            UserError::TokenExpired => "USER_TOKEN_EXPIRED",
            UserError::InvalidToken => "USER_INVALID_TOKEN",
            UserError::InternalServerError { .. } => "USER_INTERNAL_SERVER_ERROR",
        }
    }
}

impl_into_response!(UserError);

impl UserError {
    pub fn internal_server_error<S: Into<String>>(message: S) -> Self {
        Self::InternalServerError { message: message.into() }
    }
}
