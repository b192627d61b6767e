use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::AuthUser,
    errors::{ApiError, ApiResponse, ApiResult},
    extractors::{ApiJson, ApiPath},
    models::{JobCategory, JobSummary, Role},
    validation::{CategoryPayload, validate_category_changes, validate_new_category},
};

/// A category together with a summary of the jobs filed under it.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: JobCategory,
    pub jobs: Vec<JobSummary>,
}

fn category_not_found() -> ApiError {
    ApiError::NotFound("Job category not found".to_string())
}

fn trimmed(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

/// list_categories
///
/// [Public Route] All categories ordered by name, each with its job count.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "All categories", body = [JobCategory]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<Vec<JobCategory>>> {
    let categories = state.repo.list_categories().await?;
    let count = categories.len();
    Ok(ApiResponse::ok("Job categories retrieved successfully", categories).with_count(count))
}

/// get_category
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category with its jobs", body = CategoryDetail),
        (status = 404, description = "Job category not found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<CategoryDetail>> {
    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(category_not_found)?;
    let jobs = state.repo.jobs_in_category(id).await?;

    Ok(ApiResponse::ok(
        "Job category retrieved successfully",
        CategoryDetail {
            category,
            jobs: jobs.iter().map(JobSummary::from).collect(),
        },
    ))
}

/// create_category
///
/// [Admin Only]
#[utoipa::path(
    post,
    path = "/categories",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Category created", body = JobCategory),
        (status = 403, description = "Caller is not an admin"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> ApiResult<impl IntoResponse> {
    user.require_any(&[Role::Admin])?;

    let name_taken = match trimmed(payload.name.as_deref()) {
        Some(name) => state.repo.category_name_taken(name, None).await?,
        None => false,
    };
    let new_category = validate_new_category(&payload, name_taken)?;
    let category = state.repo.create_category(new_category).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Job category created successfully", category),
    ))
}

/// update_category
///
/// [Admin Only] Partial update; the name stays unique across other categories.
#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = CategoryPayload,
    responses(
        (status = 200, description = "Category updated", body = JobCategory),
        (status = 404, description = "Job category not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> ApiResult<ApiResponse<JobCategory>> {
    user.require_any(&[Role::Admin])?;

    if state.repo.get_category(id).await?.is_none() {
        return Err(category_not_found());
    }

    let name_taken = match trimmed(payload.name.as_deref()) {
        Some(name) => state.repo.category_name_taken(name, Some(id)).await?,
        None => false,
    };
    let changes = validate_category_changes(&payload, name_taken)?;

    let category = state
        .repo
        .update_category(id, changes)
        .await?
        .ok_or_else(category_not_found)?;
    Ok(ApiResponse::ok("Job category updated successfully", category))
}

/// delete_category
///
/// [Admin Only] Refused while jobs still reference the category.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 400, description = "Category still has jobs"),
        (status = 404, description = "Job category not found")
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse<()>> {
    user.require_any(&[Role::Admin])?;

    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(category_not_found)?;

    if category.job_count > 0 {
        return Err(
            ApiError::bad_request("Cannot delete category that has jobs associated with it")
                .with_detail("jobs_count", category.job_count),
        );
    }

    if !state.repo.delete_category(id).await? {
        return Err(category_not_found());
    }
    Ok(ApiResponse::ok("Job category deleted successfully", ()))
}
