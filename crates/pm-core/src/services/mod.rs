//! Domain services

pub mod auth_service;
pub mod session_authority;

pub use auth_service::{AuthService, LoginResult, NewAccount};
pub use session_authority::SessionAuthority;
