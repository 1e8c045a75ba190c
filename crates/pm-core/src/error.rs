//! Domain errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Email address not found")]
    EmailNotFound,

    #[error("User not active")]
    UserNotActive,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Username already exists: {0}")]
    UsernameAlreadyExists(String),

    #[error("Password too short")]
    PasswordTooShort,

    #[error("Password too long")]
    PasswordTooLong,

    #[error("Password too weak")]
    PasswordTooWeak,

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    #[error("Duplicate session id: {0}")]
    DuplicateSession(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Failure of a durable session store operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No candidate endpoint could be reached in time.
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    /// Insert collided with an existing session id.
    #[error("Duplicate session id: {0}")]
    DuplicateSession(String),

    /// Reached the store but the statement failed.
    #[error("Session store query failed: {0}")]
    Query(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateSession(sid) => DomainError::DuplicateSession(sid),
            other => DomainError::DatabaseError(other.to_string()),
        }
    }
}
