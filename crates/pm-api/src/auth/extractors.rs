//! axum extractors wrapping the gates.
//!
//! A handler that takes one of these never runs unless the gate accepted the
//! request. The identity is cached in request extensions so stacking two
//! extractors validates the session once.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use pm_core::ResolvedIdentity;
use pm_shared::Role;

use super::authorization::require_role;
use super::error::AuthError;
use super::gate::AuthGate;

/// Any authenticated identity, no role check.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub ResolvedIdentity);

pub type AnyAuthenticated = CurrentUser;

#[derive(Debug, Clone)]
pub struct OwnerOnly(pub ResolvedIdentity);

#[derive(Debug, Clone)]
pub struct RenterOnly(pub ResolvedIdentity);

async fn identity<S>(parts: &mut Parts, state: &S) -> Result<ResolvedIdentity, AuthError>
where
    AuthGate: FromRef<S>,
    S: Send + Sync,
{
    if let Some(identity) = parts.extensions.get::<ResolvedIdentity>() {
        return Ok(identity.clone());
    }
    let identity = AuthGate::from_ref(state).authenticate(&parts.headers).await?;
    parts.extensions.insert(identity.clone());
    Ok(identity)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        identity(parts, state).await.map(CurrentUser)
    }
}

impl<S> FromRequestParts<S> for OwnerOnly
where
    AuthGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = identity(parts, state).await?;
        require_role(&identity, Role::Owner)?;
        Ok(OwnerOnly(identity))
    }
}

impl<S> FromRequestParts<S> for RenterOnly
where
    AuthGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = identity(parts, state).await?;
        require_role(&identity, Role::Renter)?;
        Ok(RenterOnly(identity))
    }
}
