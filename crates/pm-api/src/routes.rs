use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{auth, health, roles};
use crate::state::AppState;

/// All routes with state applied. Server-wide layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/logout", post(auth::logout))
        // Role-gated routes
        .route("/api/v1/owner/ping", get(roles::owner_ping))
        .route("/api/v1/renter/ping", get(roles::renter_ping))
        .with_state(state)
}
