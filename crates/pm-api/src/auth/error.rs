//! Gate rejections

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

use crate::response::error_response;

/// Every way the Authentication or Authorization Gate can turn a request
/// away. Each variant has a stable code for clients.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid authentication scheme")]
    InvalidAuthScheme,

    #[error("Invalid authorization header format")]
    InvalidAuthFormat,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Session expired or revoked")]
    SessionExpired,

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "NOT_AUTHENTICATED",
            AuthError::InvalidAuthScheme => "INVALID_AUTH_SCHEME",
            AuthError::InvalidAuthFormat => "INVALID_AUTH_FORMAT",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::AuthFailed => "AUTH_FAILED",
            AuthError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        warn!("Request rejected by auth gate: {}", self.code());

        let status = self.status();
        let mut response = error_response(status, self.code(), &self.to_string());
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
