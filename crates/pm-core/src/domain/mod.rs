//! # PM Core - Domain Module

pub mod identity;
pub mod session;
pub mod user;

pub use identity::ResolvedIdentity;
pub use pm_shared::Role;
pub use session::Session;
pub use user::{NewUser, User, UserInfo};
