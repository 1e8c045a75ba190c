//! # PM API
//!
//! Authentication gates, HTTP handlers, DTOs and the router.

pub mod auth;
pub mod dto;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

pub use auth::{AuthError, AuthGate};
pub use routes::router;
pub use state::AppState;
