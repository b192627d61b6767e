//! Admin-only handlers. The `/admin` router enforces the role before any of these run.

use axum::extract::State;
use uuid::Uuid;

use crate::{
    AppState,
    errors::{ApiError, ApiResponse, ApiResult},
    extractors::{ApiJson, ApiPath},
    models::{DashboardStats, User},
    validation::{RolePayload, validate_role},
};

/// list_users
///
/// [Admin Only]
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<User>>> {
    let users = state.repo.list_users().await?;
    let count = users.len();
    Ok(ApiResponse::ok("Users retrieved successfully", users).with_count(count))
}

/// update_user_role
///
/// [Admin Only] The only way to grant `admin`.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = RolePayload,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 404, description = "User not found"),
        (status = 422, description = "Unknown role")
    )
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<RolePayload>,
) -> ApiResult<ApiResponse<User>> {
    let role = validate_role(&payload)?;
    let user = state
        .repo
        .set_user_role(id, role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %id, role = %role, "user role changed");
    Ok(ApiResponse::ok("User role updated successfully", user))
}

/// get_stats
///
/// [Admin Only] Dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Dashboard statistics", body = DashboardStats))
)]
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<ApiResponse<DashboardStats>> {
    let stats = state.repo.get_stats().await?;
    Ok(ApiResponse::ok(
        "Dashboard statistics retrieved successfully",
        stats,
    ))
}
