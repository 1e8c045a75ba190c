//! Role checks on an already-resolved identity

use pm_core::ResolvedIdentity;
use pm_shared::Role;
use tracing::warn;

use super::error::AuthError;

pub fn require_role(identity: &ResolvedIdentity, role: Role) -> Result<(), AuthError> {
    if identity.role == role {
        Ok(())
    } else {
        warn!(
            "User {} with role {} denied access requiring role {}",
            identity.user_id, identity.role, role
        );
        Err(AuthError::InsufficientPermissions)
    }
}
