//! PostgreSQL repository implementations

pub mod session_repo_impl;
pub mod user_repo_impl;

pub use session_repo_impl::PgSessionRepository;
pub use user_repo_impl::PgUserRepository;

use pm_core::StoreError;

/// Splits sqlx failures into "could not talk to the store" and "the store
/// rejected the statement".
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}
