//! Role-gated probes; downstream routers mount their CRUD handlers behind the
//! same extractors.

use axum::Json;

use crate::auth::{OwnerOnly, RenterOnly};
use crate::dto::PingResponse;
use crate::response::ApiResponse;

/// GET /api/v1/owner/ping
pub async fn owner_ping(OwnerOnly(identity): OwnerOnly) -> Json<ApiResponse<PingResponse>> {
    Json(ApiResponse::success(PingResponse {
        role: identity.role,
        user_id: identity.user_id,
    }))
}

/// GET /api/v1/renter/ping
pub async fn renter_ping(RenterOnly(identity): RenterOnly) -> Json<ApiResponse<PingResponse>> {
    Json(ApiResponse::success(PingResponse {
        role: identity.role,
        user_id: identity.user_id,
    }))
}
