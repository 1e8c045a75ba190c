// ============================================================================
// PM Core - Authentication Service
// File: crates/pm-core/src/services/auth_service.rs
// ============================================================================
//! Authentication service with login, register and logout

use chrono::Duration;
use pm_security::{IdentityClaims, PasswordError, PasswordService, TokenCodec};
use pm_shared::constants::TOKEN_TYPE_BEARER;
use pm_shared::utils::mask_email;
use pm_shared::Role;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{NewUser, UserInfo};
use crate::error::DomainError;
use crate::repositories::UserRepository;
use crate::services::SessionAuthority;

/// Authentication service for handling user login/register flows
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionAuthority>,
    tokens: Arc<TokenCodec>,
    access_token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionAuthority>,
        tokens: Arc<TokenCodec>,
        access_token_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            access_token_ttl,
        }
    }

    /// Login with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, DomainError> {
        info!("Login attempt for email: {}", mask_email(email));

        // 1. Find user by email
        let user = self.users.find_by_email(email).await?.ok_or_else(|| {
            warn!("Login failed: email not found: {}", mask_email(email));
            DomainError::EmailNotFound
        })?;

        // 2. Check if user can login
        if !user.can_login() {
            warn!("Login failed: user {} is not active", user.id);
            return Err(DomainError::UserNotActive);
        }

        // 3. Verify password off the async workers; the KDF is deliberately slow
        let candidate = password.to_string();
        let stored_hash = user.hashed_password.clone();
        let password_valid = tokio::task::spawn_blocking(move || {
            PasswordService::verify(&candidate, &stored_hash)
        })
        .await
        .map_err(|e| DomainError::InternalError(e.to_string()))?;

        if !password_valid {
            warn!("Login failed: invalid password for user {}", user.id);
            return Err(DomainError::InvalidCredentials);
        }

        // 4. Start session, then mint a token bound to it
        let session_id = self.sessions.start_session(user.id).await?;
        let identity = IdentityClaims {
            subject: user.email.clone(),
            user_id: user.id,
            role: user.role,
            session_id: session_id.clone(),
        };
        let access_token = self
            .tokens
            .mint(&identity, Some(self.access_token_ttl))
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;

        info!("Login successful for user {}", user.id);

        Ok(LoginResult {
            user: UserInfo::from(&user),
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            session_id,
        })
    }

    /// Register a new user
    pub async fn register(&self, account: NewAccount) -> Result<UserInfo, DomainError> {
        info!("Registration attempt for email: {}", mask_email(&account.email));

        // 1. Uniqueness checks
        if self.users.find_by_email(&account.email).await?.is_some() {
            warn!("Registration failed: email already exists");
            return Err(DomainError::EmailAlreadyExists(account.email));
        }
        if self.users.find_by_username(&account.username).await?.is_some() {
            warn!("Registration failed: username already exists");
            return Err(DomainError::UsernameAlreadyExists(account.username));
        }

        // 2. Strength check and hash, both CPU bound
        let password = account.password;
        let inputs = [account.email.clone(), account.username.clone()];
        let hashed_password = tokio::task::spawn_blocking(move || -> Result<String, PasswordError> {
            let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            PasswordService::check_strength(&password, &inputs)?;
            PasswordService::hash(&password)
        })
        .await
        .map_err(|e| DomainError::InternalError(e.to_string()))?
        .map_err(|e| match e {
            PasswordError::TooShort => DomainError::PasswordTooShort,
            PasswordError::TooLong => DomainError::PasswordTooLong,
            PasswordError::TooWeak => DomainError::PasswordTooWeak,
            PasswordError::HashError(msg) => DomainError::PasswordHashError(msg),
        })?;

        // 3. Persist
        let created = self
            .users
            .create(&NewUser {
                email: account.email,
                username: account.username,
                full_name: account.full_name,
                role: account.role,
                hashed_password,
            })
            .await?;

        info!("Registration successful for user {}", created.id);
        Ok(UserInfo::from(&created))
    }

    pub async fn logout(&self, session_id: &str) {
        self.sessions.revoke_session(session_id).await;
    }
}

/// Registration input with the plain password
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
}

/// Result of successful login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: UserInfo,
    pub access_token: String,
    pub token_type: String,
    pub session_id: String,
}
