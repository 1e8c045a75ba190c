//! API Response wrapper

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use pm_core::DomainError;
use pm_shared::constants::ERROR_CODE_HEADER;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            }),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error envelope response: JSON body plus the code repeated in a header.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let mut response = (status, Json(ApiResponse::<()>::error(code, message))).into_response();
    if let Ok(value) = HeaderValue::from_str(code) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(ERROR_CODE_HEADER), value);
    }
    response
}

/// Handler-level failures (everything after the gates).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Email not found")]
    EmailNotFound,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("User is not active")]
    UserNotActive,

    #[error("Email already registered")]
    EmailExists,

    #[error("Username already taken")]
    UsernameExists,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::EmailNotFound => "EMAIL_NOT_FOUND",
            ApiError::InvalidPassword => "INVALID_PASSWORD",
            ApiError::UserNotActive => "USER_NOT_ACTIVE",
            ApiError::EmailExists => "EMAIL_EXISTS",
            ApiError::UsernameExists => "USERNAME_EXISTS",
            ApiError::WeakPassword(_) => "WEAK_PASSWORD",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::WeakPassword(_) => StatusCode::BAD_REQUEST,
            ApiError::EmailNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidPassword => StatusCode::UNAUTHORIZED,
            ApiError::UserNotActive => StatusCode::FORBIDDEN,
            ApiError::EmailExists | ApiError::UsernameExists => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::EmailNotFound => ApiError::EmailNotFound,
            DomainError::InvalidCredentials => ApiError::InvalidPassword,
            DomainError::UserNotActive => ApiError::UserNotActive,
            DomainError::EmailAlreadyExists(_) => ApiError::EmailExists,
            DomainError::UsernameAlreadyExists(_) => ApiError::UsernameExists,
            DomainError::PasswordTooShort
            | DomainError::PasswordTooLong
            | DomainError::PasswordTooWeak => ApiError::WeakPassword(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "An internal error occurred".to_string()
            }
            other => {
                warn!("Request rejected [{}]: {}", other.code(), other);
                other.to_string()
            }
        };
        error_response(status, self.code(), &message)
    }
}
