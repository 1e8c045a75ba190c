//! Request-scoped identity produced by successful authentication

use pm_security::TokenClaims;
use pm_shared::Role;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIdentity {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub session_id: String,
}

impl From<TokenClaims> for ResolvedIdentity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.sub,
            role: claims.role,
            session_id: claims.sid,
        }
    }
}
