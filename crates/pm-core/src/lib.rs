//! # PM Core
//!
//! Domain entities, repository ports and the session/auth services.

pub mod cache;
pub mod domain;
pub mod error;
pub mod repositories;
pub mod services;

pub use cache::VolatileSessionStore;
pub use domain::*;
pub use error::{DomainError, StoreError};
pub use services::{AuthService, LoginResult, NewAccount, SessionAuthority};
