// ============================================================================
// PM API - Auth Handlers
// File: crates/pm-api/src/handlers/auth.rs
// ============================================================================
//! Authentication HTTP handlers (register, login, me, logout)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use pm_core::{NewAccount, ResolvedIdentity, UserInfo};
use pm_shared::Role;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::dto::{describe_validation_errors, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest};
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

fn parse_body<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    body.validate()
        .map_err(|e| ApiError::Validation(describe_validation_errors(&e)))?;
    Ok(body)
}

/// Register handler - POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), ApiError> {
    let body = parse_body(payload)?;
    let role = Role::from_str(&body.role)
        .ok_or_else(|| ApiError::Validation("role must be 'owner' or 'renter'".into()))?;

    let user = state
        .auth
        .register(NewAccount {
            email: body.email.trim().to_string(),
            username: body.username.trim().to_string(),
            full_name: body.full_name.trim().to_string(),
            role,
            password: body.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Login handler - POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let body = parse_body(payload)?;
    let result = state.auth.login(body.email.trim(), &body.password).await?;
    Ok(Json(ApiResponse::success(LoginResponse::from(result))))
}

/// Current identity - GET /api/v1/auth/me
pub async fn me(CurrentUser(identity): CurrentUser) -> Json<ApiResponse<ResolvedIdentity>> {
    Json(ApiResponse::success(identity))
}

/// Logout handler - POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Json<ApiResponse<LogoutResponse>> {
    state.auth.logout(&identity.session_id).await;
    Json(ApiResponse::success(LogoutResponse {
        message: "Logged out".to_string(),
        session_id: identity.session_id,
    }))
}
