mod common;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use common::{TestApp, body_json};
use jobboard_api::{
    auth::AuthUser,
    errors::ApiError,
    extractors::{ApiJson, ApiPath, ApiQuery},
    handlers,
    models::{ApplicationStatus, NewApplication, Role, User},
    repository::Repository,
    search::JobFilter,
    validation::{ApplicationPayload, CategoryPayload, JobPayload, StatusPayload},
};
use tokio::test;
use uuid::Uuid;

// --- TEST UTILITIES ---

fn as_auth(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role.clone(),
    }
}

fn application(job_id: Uuid, email: &str) -> NewApplication {
    NewApplication {
        job_id,
        user_id: None,
        applicant_name: "Test Applicant".to_string(),
        applicant_email: email.to_string(),
        phone: None,
        resume_url: Some("https://example.com/cv.pdf".to_string()),
        resume: None,
        cover_letter: None,
    }
}

// --- HANDLER TESTS ---

#[test]
async fn test_get_job_success() {
    let app = TestApp::new();
    let company = app.user(Role::Company).await;
    let job = app.job(&company, "Embedded Engineer").await;

    let result = handlers::jobs::get_job(State(app.state()), ApiPath(job.id)).await;

    let response = result.unwrap().into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["id"], job.id.to_string());
    assert_eq!(body["message"], "Job retrieved successfully");
}

#[test]
async fn test_get_job_not_found() {
    let app = TestApp::new();

    let result = handlers::jobs::get_job(State(app.state()), ApiPath(Uuid::new_v4())).await;

    let err = result.err().unwrap();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_list_jobs_sorted_by_relevance() {
    let app = TestApp::new();
    let company = app.user(Role::Company).await;
    let mut berlin = common::new_job("Frontend Developer");
    berlin.location = "Rust Belt".to_string();
    app.repo.create_job(berlin, Some(company.id)).await.unwrap();
    app.job(&company, "Rust Developer").await;

    let filter = JobFilter {
        q: Some("rust".to_string()),
        sort: Some("relevance".to_string()),
        ..Default::default()
    };
    let response = handlers::jobs::list_jobs(State(app.state()), ApiQuery(filter))
        .await
        .unwrap();

    assert_eq!(response.data.len(), 2);
    assert_eq!(response.data[0].title, "Rust Developer");
    assert_eq!(response.pagination.unwrap().total, 2);
}

#[test]
async fn test_create_job_unknown_category() {
    let app = TestApp::new();
    let company = app.user(Role::Company).await;

    let payload: JobPayload = serde_json::from_value(common::job_payload()).unwrap();
    let payload = JobPayload {
        category_id: Some(42),
        ..payload
    };

    let result =
        handlers::jobs::create_job(as_auth(&company), State(app.state()), ApiJson(payload)).await;

    match result.err().unwrap() {
        ApiError::Validation(errors) => {
            assert_eq!(
                errors.get("category_id").unwrap()[0],
                "Selected job category does not exist. Please choose a valid category."
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
async fn test_delete_job_not_owner() {
    let app = TestApp::new();
    let owner = app.user(Role::Company).await;
    let other = app.user(Role::Company).await;
    let job = app.job(&owner, "Firmware Engineer").await;

    let result =
        handlers::jobs::delete_job(as_auth(&other), State(app.state()), ApiPath(job.id)).await;

    assert!(matches!(result, Err(ApiError::Forbidden)));
    assert!(app.repo.get_job(job.id).await.unwrap().is_some());
}

#[test]
async fn test_update_job_with_empty_body_keeps_fields() {
    let app = TestApp::new();
    let owner = app.user(Role::Company).await;
    let job = app.job(&owner, "Security Analyst").await;

    let response = handlers::jobs::update_job(
        as_auth(&owner),
        State(app.state()),
        ApiPath(job.id),
        ApiJson(JobPayload::default()),
    )
    .await
    .unwrap();

    assert_eq!(response.data.title, "Security Analyst");
    assert_eq!(
        response.extra["validation_info"]["fields_updated"],
        serde_json::json!([])
    );
}

#[test]
async fn test_apply_after_deadline() {
    let app = TestApp::new();
    let company = app.user(Role::Company).await;
    let job = app.job(&company, "Seasonal Developer").await;

    // Deadlines are validated as future dates on input, so age the stored row directly.
    let mut late = common::new_job("Seasonal Developer");
    late.application_deadline = Some(Utc::now() - Duration::days(1));
    let late = app.repo.create_job(late, Some(company.id)).await.unwrap();

    let payload = |job_id: Uuid| ApplicationPayload {
        job_id: Some(job_id.to_string()),
        applicant_name: Some("Ken Thompson".to_string()),
        applicant_email: Some("ken@example.com".to_string()),
        resume_url: Some("https://example.com/ken.pdf".to_string()),
        ..Default::default()
    };

    let result = handlers::applications::submit_application(
        None,
        State(app.state()),
        ApiJson(payload(late.id)),
    )
    .await;
    match result.err().unwrap() {
        ApiError::BadRequest { message, .. } => {
            assert_eq!(message, "Application deadline has passed for this job")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let result =
        handlers::applications::submit_application(None, State(app.state()), ApiJson(payload(job.id)))
            .await;
    assert!(result.is_ok());
}

#[test]
async fn test_update_status_requires_reviewer() {
    let app = TestApp::new();
    let company = app.user(Role::Company).await;
    let client = app.user(Role::Client).await;
    let job = app.job(&company, "Support Engineer").await;
    let submitted = app
        .repo
        .create_application(application(job.id, "a@example.com"))
        .await
        .unwrap();

    let payload = StatusPayload {
        status: Some("reviewed".to_string()),
        admin_notes: None,
    };

    let result = handlers::applications::update_application_status(
        as_auth(&client),
        State(app.state()),
        ApiPath(submitted.id),
        ApiJson(payload.clone()),
    )
    .await;
    assert!(matches!(result, Err(ApiError::Forbidden)));

    let response = handlers::applications::update_application_status(
        as_auth(&company),
        State(app.state()),
        ApiPath(submitted.id),
        ApiJson(payload),
    )
    .await
    .unwrap();
    assert_eq!(response.data.status, ApplicationStatus::Reviewed.as_str());
}

#[test]
async fn test_update_status_rejects_unknown_status() {
    let app = TestApp::new();
    let admin = app.user(Role::Admin).await;

    let result = handlers::applications::update_application_status(
        as_auth(&admin),
        State(app.state()),
        ApiPath(Uuid::new_v4()),
        ApiJson(StatusPayload {
            status: Some("hired".to_string()),
            admin_notes: None,
        }),
    )
    .await;

    let err = result.err().unwrap();
    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
async fn test_delete_application_admin_only() {
    let app = TestApp::new();
    let company = app.user(Role::Company).await;
    let admin = app.user(Role::Admin).await;
    let job = app.job(&company, "Release Engineer").await;
    let submitted = app
        .repo
        .create_application(application(job.id, "b@example.com"))
        .await
        .unwrap();

    let result = handlers::applications::delete_application(
        as_auth(&company),
        State(app.state()),
        ApiPath(submitted.id),
    )
    .await;
    assert!(matches!(result, Err(ApiError::Forbidden)));

    let result = handlers::applications::delete_application(
        as_auth(&admin),
        State(app.state()),
        ApiPath(submitted.id),
    )
    .await;
    assert!(result.is_ok());
    assert!(app.repo.get_application(submitted.id).await.unwrap().is_none());
}

#[test]
async fn test_category_update_not_found() {
    let app = TestApp::new();
    let admin = app.user(Role::Admin).await;

    let result = handlers::categories::update_category(
        as_auth(&admin),
        State(app.state()),
        ApiPath(404),
        ApiJson(CategoryPayload {
            name: Some("Anything".to_string()),
            description: None,
        }),
    )
    .await;

    match result.err().unwrap() {
        ApiError::NotFound(message) => assert_eq!(message, "Job category not found"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
async fn test_admin_stats_counts_pending() {
    let app = TestApp::new();
    let company = app.user(Role::Company).await;
    let job = app.job(&company, "Build Engineer").await;
    let first = app
        .repo
        .create_application(application(job.id, "c@example.com"))
        .await
        .unwrap();
    app.repo
        .create_application(application(job.id, "d@example.com"))
        .await
        .unwrap();
    app.repo
        .update_application_status(first.id, ApplicationStatus::Rejected, None)
        .await
        .unwrap();

    let response = handlers::admin::get_stats(State(app.state())).await.unwrap();

    assert_eq!(response.data.total_jobs, 1);
    assert_eq!(response.data.total_applications, 2);
    assert_eq!(response.data.pending_applications, 1);
    assert_eq!(response.data.total_users, 1);
}
