//! Request and response bodies for the auth endpoints

use pm_core::{LoginResult, UserInfo};
use pm_shared::Role;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 3, max = 50, message = "must be 3-50 characters"))]
    pub username: String,

    #[validate(length(min = 1, max = 255, message = "must not be empty"))]
    pub full_name: String,

    /// Strength and length are checked by the auth service.
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,

    #[validate(custom(function = "validate_role"))]
    pub role: String,
}

fn validate_role(role: &str) -> Result<(), ValidationError> {
    match Role::from_str(role) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("role").with_message("must be 'owner' or 'renter'".into())),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub session_id: String,
    pub user: UserInfo,
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        Self {
            access_token: result.access_token,
            token_type: result.token_type,
            session_id: result.session_id,
            user: result.user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub role: Role,
    pub user_id: i64,
}

/// Flattens validator output into one readable line, fields sorted.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "is invalid".to_string());
            format!("{} {}", field, reason)
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
