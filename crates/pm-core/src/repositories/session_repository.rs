//! Durable session store trait (port)

use async_trait::async_trait;

use crate::error::StoreError;

/// Source of truth for session state. Every call is its own atomic unit;
/// implementations must not hold a transaction across calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Inserts a fresh row expiring one window from now. A colliding id is
    /// `StoreError::DuplicateSession`.
    async fn create(&self, session_id: &str, user_id: i64) -> Result<(), StoreError>;

    /// Side-effect free. Absent, revoked and expired rows are all `false`.
    async fn is_active(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Slides expiry and last-seen if the session is still active. `Ok(false)`
    /// when it is absent, revoked or already expired.
    async fn touch(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Idempotent.
    async fn revoke(&self, session_id: &str) -> Result<(), StoreError>;
}
