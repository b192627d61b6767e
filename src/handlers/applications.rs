use axum::{
    body::Body,
    extract::{State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    errors::{ApiError, ApiResponse, ApiResult},
    extractors::{ApiJson, ApiMultipart, ApiPath, ApiQuery},
    handlers::{ensure_job_owner, find_job},
    models::{
        ApplicationQuery, ApplicationStats, ApplicationStatus, Job, JobApplication, JobSummary,
        NewApplication, ResumeFile, Role,
    },
    search::PageRequest,
    storage::{StorageError, mime_from_filename, resume_extension, resume_key, sanitize_key},
    validation::{
        ApplicationInput, ApplicationPayload, ResumeSource, StatusPayload, ValidationErrors,
        validate_application, validate_status,
    },
};

const REVIEWER_ROLES: [Role; 2] = [Role::Company, Role::Admin];

fn application_not_found() -> ApiError {
    ApiError::NotFound("Job application not found".to_string())
}

/// Query string of `GET /applications`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApplicationFilter {
    pub job_id: Option<Uuid>,
    /// One of `pending`, `reviewed`, `accepted`, `rejected`.
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// An application together with a summary of the job it targets.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: JobApplication,
    pub job: Option<JobSummary>,
}

/// Form fields accepted by `POST /jobs/{id}/apply`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ResumeUploadForm {
    applicant_name: String,
    applicant_email: String,
    phone: Option<String>,
    cover_letter: Option<String>,
    /// PDF, DOC or DOCX, at most 5MB.
    #[schema(value_type = String, format = Binary)]
    resume: Vec<u8>,
}

/// Rejects duplicates and late submissions. Runs before anything is written.
async fn ensure_can_apply(state: &AppState, job: &Job, email: &str) -> ApiResult<()> {
    if let Some(existing) = state.repo.find_application_by_email(job.id, email).await? {
        return Err(ApiError::conflict("You have already applied for this job")
            .with_detail("application_id", existing.id.to_string()));
    }

    if job.application_deadline.is_some_and(|deadline| deadline < Utc::now()) {
        return Err(ApiError::bad_request(
            "Application deadline has passed for this job",
        ));
    }

    Ok(())
}

/// Inserts the application. A duplicate that slipped past `ensure_can_apply` fails on the
/// unique constraint; the resulting 409 still names the existing application.
async fn insert_application(
    state: &AppState,
    record: NewApplication,
) -> ApiResult<JobApplication> {
    let (job_id, email) = (record.job_id, record.applicant_email.clone());
    let err = match state.repo.create_application(record).await {
        Ok(application) => return Ok(application),
        Err(err) => ApiError::from(err),
    };

    if matches!(err, ApiError::Conflict { .. }) {
        if let Ok(Some(existing)) = state.repo.find_application_by_email(job_id, &email).await {
            return Err(err.with_detail("application_id", existing.id.to_string()));
        }
    }
    Err(err)
}

fn new_application(
    input: ApplicationInput,
    user_id: Option<Uuid>,
    resume: Option<ResumeFile>,
) -> NewApplication {
    NewApplication {
        job_id: input.job_id,
        user_id,
        applicant_name: input.applicant_name,
        applicant_email: input.applicant_email,
        phone: input.phone,
        resume_url: input.resume_url,
        resume,
        cover_letter: input.cover_letter,
    }
}

fn log_submission(application: &JobApplication, job: &Job) {
    tracing::info!(
        application_id = %application.id,
        job_id = %job.id,
        job_title = %job.title,
        company = %job.company,
        applicant = %application.applicant_email,
        has_resume_file = application.resume_file.is_some(),
        "new job application received"
    );
}

fn submitted(application: JobApplication) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        ApiResponse::ok("Job application submitted successfully", application),
    )
}

/// submit_application
///
/// [Public Route] JSON submission with a `resume_url`. A signed-in caller is recorded as the
/// applicant user.
#[utoipa::path(
    post,
    path = "/applications",
    request_body = ApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = JobApplication),
        (status = 400, description = "Application deadline has passed"),
        (status = 409, description = "Already applied"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn submit_application(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ApplicationPayload>,
) -> ApiResult<impl IntoResponse> {
    let job = match payload.job_uuid() {
        Some(id) => state.repo.get_job(id).await?,
        None => None,
    };

    let input = validate_application(&payload, job.is_some(), ResumeSource::Url)?;
    let job = job.ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    ensure_can_apply(&state, &job, &input.applicant_email).await?;

    let application =
        insert_application(&state, new_application(input, user.map(|u| u.id), None)).await?;

    log_submission(&application, &job);
    Ok(submitted(application))
}

/// An uploaded resume part, checked for size and type but not yet stored.
struct ResumeUpload {
    original_name: String,
    mime: String,
    extension: &'static str,
    bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File too large. Maximum size is 5MB.".to_string())
    } else {
        ApiError::bad_request(err.body_text())
    }
}

fn check_resume(
    original_name: String,
    declared: Option<String>,
    bytes: Vec<u8>,
    max_bytes: usize,
) -> ApiResult<ResumeUpload> {
    // Browsers fall back to octet-stream for unknown types; trust the extension then.
    let mime = match declared {
        Some(mime) if mime != "application/octet-stream" => Some(mime),
        _ => mime_from_filename(&original_name).map(str::to_string),
    };

    let (mime, extension) = mime
        .and_then(|m| resume_extension(&m).map(|ext| (m, ext)))
        .ok_or_else(|| {
            ApiError::UnsupportedMediaType(
                "Invalid file type. Only PDF, DOC, and DOCX files are allowed.".to_string(),
            )
        })?;

    if bytes.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge(
            "File too large. Maximum size is 5MB.".to_string(),
        ));
    }

    Ok(ResumeUpload {
        original_name,
        mime,
        extension,
        bytes,
    })
}

/// apply_with_resume
///
/// [Public Route] Multipart submission carrying the resume file itself.
///
/// The resume is only written to storage once the submission has passed validation, the
/// duplicate check and the deadline check. It is removed again if persisting the
/// application fails.
#[utoipa::path(
    post,
    path = "/jobs/{id}/apply",
    params(("id" = Uuid, Path, description = "Job ID")),
    request_body(content = ResumeUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Application submitted", body = JobApplication),
        (status = 400, description = "Resume missing or deadline passed"),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Already applied"),
        (status = 413, description = "Resume too large"),
        (status = 415, description = "Resume is not PDF, DOC or DOCX"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn apply_with_resume(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    ApiPath(job_id): ApiPath<Uuid>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> ApiResult<impl IntoResponse> {
    // 1. Read the form
    let mut payload = ApplicationPayload {
        job_id: Some(job_id.to_string()),
        ..Default::default()
    };
    let mut resume = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let original_name = field.file_name().unwrap_or("resume").to_string();
                let declared = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
                resume = Some(check_resume(
                    original_name,
                    declared,
                    bytes,
                    state.config.max_upload_bytes,
                )?);
            }
            "applicant_name" | "applicant_email" | "phone" | "cover_letter" => {
                let value = Some(field.text().await.map_err(multipart_error)?);
                match name.as_str() {
                    "applicant_name" => payload.applicant_name = value,
                    "applicant_email" => payload.applicant_email = value,
                    "phone" => payload.phone = value,
                    _ => payload.cover_letter = value,
                }
            }
            _ => {}
        }
    }

    let resume = resume.ok_or_else(|| ApiError::bad_request("Resume file is required"))?;

    // 2. Validate against the job
    let job = find_job(&state.repo, job_id).await?;
    let input = validate_application(&payload, true, ResumeSource::Upload)?;
    ensure_can_apply(&state, &job, &input.applicant_email).await?;

    // 3. Store the file, then the application
    let key = resume_key(resume.extension);
    let size = resume.bytes.len() as i64;
    state.storage.put(&key, &resume.mime, resume.bytes).await?;

    let record = new_application(
        input,
        user.map(|u| u.id),
        Some(ResumeFile {
            key: key.clone(),
            original_name: resume.original_name,
            size,
            mime: resume.mime,
        }),
    );

    match insert_application(&state, record).await {
        Ok(application) => {
            log_submission(&application, &job);
            Ok(submitted(application))
        }
        Err(err) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "failed to remove orphaned resume");
            }
            Err(err)
        }
    }
}

/// list_applications
///
/// [Authenticated Route] Companies and admins; newest first, paginated.
#[utoipa::path(
    get,
    path = "/applications",
    params(ApplicationFilter),
    responses(
        (status = 200, description = "Page of applications", body = [JobApplication]),
        (status = 403, description = "Caller is not a company or admin")
    )
)]
pub async fn list_applications(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ApplicationFilter>,
) -> ApiResult<ApiResponse<Vec<JobApplication>>> {
    user.require_any(&REVIEWER_ROLES)?;

    let status = match filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<ApplicationStatus>().map_err(|_| {
            ValidationErrors::single("status", "The selected status is invalid.")
        })?),
        None => None,
    };

    let applications = state
        .repo
        .list_applications(&ApplicationQuery {
            job_id: filter.job_id,
            status,
            user_id: None,
        })
        .await?;

    let (page, pagination) = PageRequest::new(filter.page, filter.per_page).slice(applications);
    let count = page.len();
    Ok(
        ApiResponse::ok("Job applications retrieved successfully", page)
            .with_count(count)
            .with_pagination(pagination),
    )
}

/// get_application
///
/// [Authenticated Route] Companies, admins and the applicant themself.
#[utoipa::path(
    get,
    path = "/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application found", body = ApplicationDetail),
        (status = 403, description = "Not allowed to view this application"),
        (status = 404, description = "Job application not found")
    )
)]
pub async fn get_application(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ApplicationDetail>> {
    let application = state
        .repo
        .get_application(id)
        .await?
        .ok_or_else(application_not_found)?;

    let is_reviewer = user.require_any(&REVIEWER_ROLES).is_ok();
    if !is_reviewer && application.user_id != Some(user.id) {
        return Err(ApiError::Forbidden);
    }

    let job = state.repo.get_job(application.job_id).await?;
    Ok(ApiResponse::ok(
        "Job application retrieved successfully",
        ApplicationDetail {
            application,
            job: job.as_ref().map(JobSummary::from),
        },
    ))
}

/// update_application_status
///
/// [Authenticated Route] Companies and admins move an application through review.
#[utoipa::path(
    put,
    path = "/applications/{id}/status",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = StatusPayload,
    responses(
        (status = 200, description = "Status updated", body = JobApplication),
        (status = 404, description = "Job application not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_application_status(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusPayload>,
) -> ApiResult<ApiResponse<JobApplication>> {
    user.require_any(&REVIEWER_ROLES)?;

    let (status, notes) = validate_status(&payload)?;
    let previous = state
        .repo
        .get_application(id)
        .await?
        .ok_or_else(application_not_found)?;

    let application = state
        .repo
        .update_application_status(id, status, notes)
        .await?
        .ok_or_else(application_not_found)?;

    tracing::info!(
        application_id = %id,
        applicant = %application.applicant_email,
        from = %previous.status,
        to = %application.status,
        changed_by = %user.id,
        "application status changed"
    );

    Ok(ApiResponse::ok(
        "Application status updated successfully",
        application,
    ))
}

/// delete_application
///
/// [Authenticated Route] Admin only. Also removes the stored resume, if any.
#[utoipa::path(
    delete,
    path = "/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Job application not found")
    )
)]
pub async fn delete_application(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    user.require_any(&[Role::Admin])?;

    let application = state
        .repo
        .get_application(id)
        .await?
        .ok_or_else(application_not_found)?;

    if !state.repo.delete_application(id).await? {
        return Err(application_not_found());
    }

    if let Some(key) = application.resume_file.as_deref() {
        if let Err(err) = state.storage.delete(key).await {
            tracing::warn!(key = %key, error = %err, "failed to remove resume of deleted application");
        }
    }

    Ok(ApiResponse::ok("Job application deleted successfully", ()))
}

/// job_applications
///
/// [Authenticated Route] Applications received by one job, for its owner or an admin.
#[utoipa::path(
    get,
    path = "/jobs/{id}/applications",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Applications for the job", body = [JobApplication]),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Job not found")
    )
)]
pub async fn job_applications(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<JobApplication>>> {
    let job = find_job(&state.repo, id).await?;
    ensure_job_owner(&user, &job)?;

    let applications = state
        .repo
        .list_applications(&ApplicationQuery {
            job_id: Some(id),
            ..Default::default()
        })
        .await?;
    let count = applications.len();

    Ok(
        ApiResponse::ok("Job applications retrieved successfully", applications)
            .with_count(count)
            .with_extra(
                "job",
                json!({ "id": job.id, "title": job.title, "company": job.company }),
            ),
    )
}

/// my_applications
///
/// [Authenticated Route] Applications submitted while signed in as the caller.
#[utoipa::path(
    get,
    path = "/me/applications",
    responses((status = 200, description = "Caller's applications", body = [JobApplication]))
)]
pub async fn my_applications(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<Vec<JobApplication>>> {
    let applications = state
        .repo
        .list_applications(&ApplicationQuery {
            user_id: Some(id),
            ..Default::default()
        })
        .await?;
    let count = applications.len();
    Ok(ApiResponse::ok("Your applications retrieved successfully", applications).with_count(count))
}

/// application_stats
///
/// [Authenticated Route] Totals with status and per-job breakdowns.
#[utoipa::path(
    get,
    path = "/applications/stats/summary",
    responses(
        (status = 200, description = "Application statistics", body = ApplicationStats),
        (status = 403, description = "Caller is not a company or admin")
    )
)]
pub async fn application_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<ApplicationStats>> {
    user.require_any(&REVIEWER_ROLES)?;
    let stats = state.repo.application_stats().await?;
    Ok(ApiResponse::ok(
        "Application statistics retrieved successfully",
        stats,
    ))
}

/// download_resume
///
/// [Authenticated Route] Streams a stored resume back as an attachment.
#[utoipa::path(
    get,
    path = "/resumes/{filename}",
    params(("filename" = String, Path, description = "Stored resume file name")),
    responses(
        (status = 200, description = "Resume file", content_type = "application/octet-stream"),
        (status = 404, description = "Resume file not found")
    )
)]
pub async fn download_resume(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(filename): ApiPath<String>,
) -> ApiResult<Response> {
    user.require_any(&REVIEWER_ROLES)?;

    let not_found = || ApiError::NotFound("Resume file not found".to_string());

    // Only the last segment names a file; anything before it is discarded.
    let clean = sanitize_key(&filename);
    let name = clean
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(not_found)?
        .to_string();

    let bytes = match state.storage.get(&format!("resumes/{name}")).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => return Err(not_found()),
        Err(err) => return Err(err.into()),
    };

    let content_type = mime_from_filename(&name).unwrap_or("application/octet-stream");
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        )
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_upload_is_accepted() {
        let upload =
            check_resume("cv.pdf".into(), Some("application/pdf".into()), vec![1, 2, 3], 10)
                .unwrap();
        assert_eq!(upload.extension, "pdf");
        assert_eq!(upload.mime, "application/pdf");
    }

    #[test]
    fn octet_stream_falls_back_to_extension() {
        let upload = check_resume(
            "cv.docx".into(),
            Some("application/octet-stream".into()),
            vec![0],
            10,
        )
        .unwrap();
        assert_eq!(upload.extension, "docx");
    }

    #[test]
    fn images_are_rejected() {
        let err = check_resume("cv.png".into(), Some("image/png".into()), vec![0], 10)
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn oversized_uploads_are_rejected() {
        let err = check_resume("cv.pdf".into(), Some("application/pdf".into()), vec![0; 11], 10)
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
