use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    errors::{ApiError, ApiResponse, ApiResult},
    extractors::{ApiJson, ApiPath, ApiQuery},
    handlers::{ensure_job_owner, find_job},
    models::{Job, NewJob, Role},
    search::{self, JobFilter},
    validation::{JobContext, JobPayload, validate_job_changes, validate_new_job},
};

/// Builds the validation context: today's date and whether the referenced category exists.
async fn job_context(state: &AppState, payload: &JobPayload) -> ApiResult<JobContext> {
    let category_exists = match payload.category_id {
        Some(id) => state.repo.get_category(id).await?.is_some(),
        None => true,
    };
    Ok(JobContext {
        today: Utc::now().date_naive(),
        category_exists,
    })
}

/// list_jobs
///
/// [Public Route] Filtered, sorted and paginated job listing.
///
/// Text, location, company, type, category, remote and age filters are pushed to the store.
/// Salary bounds, ordering and paging happen in `search::search`.
#[utoipa::path(
    get,
    path = "/jobs",
    params(JobFilter),
    responses((status = 200, description = "Page of jobs", body = [Job]))
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<JobFilter>,
) -> ApiResult<ApiResponse<Vec<Job>>> {
    let candidates = state.repo.search_jobs(&filter).await?;
    let (jobs, pagination) = search::search(candidates, &filter);

    Ok(ApiResponse::ok("Jobs retrieved successfully", jobs)
        .with_pagination(pagination))
}

/// get_job
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job found", body = Job),
        (status = 404, description = "Job not found")
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Job>> {
    let job = find_job(&state.repo, id).await?;
    Ok(ApiResponse::ok("Job retrieved successfully", job))
}

/// create_job
///
/// [Authenticated Route] Companies and admins post jobs; the caller is recorded as `posted_by`.
#[utoipa::path(
    post,
    path = "/jobs",
    request_body = JobPayload,
    responses(
        (status = 201, description = "Job created", body = Job),
        (status = 403, description = "Caller is not a company or admin"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_job(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<JobPayload>,
) -> ApiResult<impl IntoResponse> {
    user.require_any(&[Role::Company, Role::Admin])?;

    let ctx = job_context(&state, &payload).await?;
    let new_job = validate_new_job(&payload, &ctx)?;
    let job = state.repo.create_job(new_job, Some(user.id)).await?;

    tracing::info!(job_id = %job.id, posted_by = %user.id, "job created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Job created successfully", job).with_extra(
            "validation_info",
            json!({
                "all_required_fields_provided": true,
                "data_cleaned_and_validated": true,
            }),
        ),
    ))
}

/// validate_job
///
/// [Public Route] Dry run of job creation: validates and cleans the payload without saving it.
#[utoipa::path(
    post,
    path = "/jobs/validate",
    request_body = JobPayload,
    responses(
        (status = 200, description = "Payload is valid", body = NewJob),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn validate_job(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<JobPayload>,
) -> ApiResult<ApiResponse<NewJob>> {
    let ctx = job_context(&state, &payload).await?;
    let cleaned = validate_new_job(&payload, &ctx)?;

    Ok(
        ApiResponse::ok("Form validation passed successfully", cleaned).with_extra(
            "validation_summary",
            json!({
                "all_required_fields_valid": true,
                "data_cleaned": true,
                "ready_for_submission": true,
            }),
        ),
    )
}

/// update_job
///
/// [Authenticated Route] Partial update. Only the fields present in the body are validated
/// and written.
#[utoipa::path(
    put,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    request_body = JobPayload,
    responses(
        (status = 200, description = "Job updated", body = Job),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Job not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_job(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<JobPayload>,
) -> ApiResult<ApiResponse<Job>> {
    let existing = find_job(&state.repo, id).await?;
    ensure_job_owner(&user, &existing)?;

    let ctx = job_context(&state, &payload).await?;
    let changes = validate_job_changes(&payload, &ctx)?;
    let fields_updated = changes.field_names();

    let job = state
        .repo
        .update_job(id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    Ok(ApiResponse::ok("Job updated successfully", job).with_extra(
        "validation_info",
        json!({
            "fields_updated": fields_updated,
            "data_cleaned_and_validated": true,
        }),
    ))
}

/// delete_job
///
/// [Authenticated Route] Refused while the job still has applications.
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job deleted"),
        (status = 400, description = "Job has applications"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Job not found")
    )
)]
pub async fn delete_job(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let job = find_job(&state.repo, id).await?;
    ensure_job_owner(&user, &job)?;

    let applications = state.repo.count_applications_for_job(id).await?;
    if applications > 0 {
        return Err(ApiError::bad_request("Cannot delete job that has applications")
            .with_detail("applications_count", applications)
            .with_detail(
                "suggestion",
                "Consider marking the job as closed instead of deleting it",
            ));
    }

    if !state.repo.delete_job(id).await? {
        return Err(ApiError::NotFound("Job not found".to_string()));
    }

    tracing::info!(job_id = %id, deleted_by = %user.id, "job deleted");
    Ok(ApiResponse::ok("Job deleted successfully", ()))
}
