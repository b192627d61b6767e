//! HTTP handlers, grouped by resource.
//!
//! Every handler returns `ApiResult<_>`; success bodies use the `ApiResponse` envelope.

use axum::Json;
use serde_json::{Value, json};

use crate::{
    auth::AuthUser,
    errors::{ApiError, ApiResult},
    models::{Job, Role},
    repository::RepositoryState,
};

pub mod admin;
pub mod applications;
pub mod assistant;
pub mod auth;
pub mod categories;
pub mod jobs;

/// health
///
/// [Public Route] Liveness check for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "jobboard-api" }))
}

/// Admins may act on any job; companies only on jobs they posted.
pub(crate) fn ensure_job_owner(user: &AuthUser, job: &Job) -> ApiResult<()> {
    if user.is_admin() || (user.has_role(Role::Company) && job.posted_by == Some(user.id)) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub(crate) async fn find_job(repo: &RepositoryState, id: uuid::Uuid) -> ApiResult<Job> {
    repo.get_job(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}
