//! Authentication Gate and role-based Authorization Gate

pub mod authorization;
pub mod error;
pub mod extractors;
pub mod gate;

pub use authorization::require_role;
pub use error::AuthError;
pub use extractors::{AnyAuthenticated, CurrentUser, OwnerOnly, RenterOnly};
pub use gate::AuthGate;
