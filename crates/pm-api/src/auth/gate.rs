// ============================================================================
// PM API - Authentication Gate
// File: crates/pm-api/src/auth/gate.rs
// ============================================================================
//! Bearer token -> decoded claims -> active session -> resolved identity.
//!
//! Each step either advances or ends the request with one `AuthError`;
//! nothing is retried within a request.

use axum::http::{header, HeaderMap};
use futures::FutureExt;
use pm_core::{ResolvedIdentity, SessionAuthority};
use pm_security::{JwtError, TokenCodec};
use pm_shared::constants::BEARER_SCHEME;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

use super::error::AuthError;

#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<TokenCodec>,
    sessions: Arc<SessionAuthority>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenCodec>, sessions: Arc<SessionAuthority>) -> Self {
        Self { tokens, sessions }
    }

    /// Runs the full check. A panic anywhere below surfaces as `AuthFailed`
    /// instead of tearing down the connection.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<ResolvedIdentity, AuthError> {
        match AssertUnwindSafe(self.resolve(headers)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Unexpected failure while authenticating request");
                Err(AuthError::AuthFailed)
            }
        }
    }

    async fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedIdentity, AuthError> {
        let token = bearer_token(headers)?;

        let claims = self.tokens.decode(token).map_err(|e| match e {
            JwtError::TokenExpired => AuthError::TokenExpired,
            JwtError::InvalidToken(detail) => {
                debug!("Token rejected: {}", detail);
                AuthError::InvalidToken
            }
            JwtError::CreationError(_) | JwtError::UnsupportedAlgorithm(_) => AuthError::AuthFailed,
        })?;

        if !self.sessions.validate(&claims.sid).await {
            return Err(AuthError::SessionExpired);
        }

        Ok(ResolvedIdentity::from(claims))
    }
}

/// Pulls the token out of `Authorization: <scheme> <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::NotAuthenticated)?;
    let value = value.to_str().map_err(|_| AuthError::InvalidAuthFormat)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthFormat)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(AuthError::InvalidAuthScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthFormat);
    }
    Ok(token)
}
