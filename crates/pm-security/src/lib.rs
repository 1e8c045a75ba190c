//! # PM Security
//!
//! Password hashing, signed bearer tokens and session identifiers.

pub mod jwt;
pub mod password;
pub mod session;

pub use jwt::{decode_token, mint_token, IdentityClaims, JwtError, TokenClaims, TokenCodec};
pub use password::{hash_password, verify_password, PasswordError, PasswordService};
pub use session::generate_session_id;
