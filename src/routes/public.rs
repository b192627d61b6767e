use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Room for the text parts of the apply form on top of the resume itself.
const FORM_FIELDS_ALLOWANCE: usize = 64 * 1024;

/// Public Router Module
///
/// Endpoints reachable without credentials: browsing jobs and categories, submitting
/// applications, signing up and signing in.
///
/// The application routes still accept an optional `AuthUser`; a signed-in applicant is
/// recorded on the application.
pub fn public_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(handlers::health))
        // --- Identity ---
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        // --- Jobs ---
        // GET /jobs?q=...&location=...&sort=relevance&page=2
        .route("/jobs", get(handlers::jobs::list_jobs))
        // POST /jobs/validate
        // Dry-run validation used by the job posting form.
        .route("/jobs/validate", post(handlers::jobs::validate_job))
        .route("/jobs/{id}", get(handlers::jobs::get_job))
        // --- Categories ---
        .route("/categories", get(handlers::categories::list_categories))
        .route("/categories/{id}", get(handlers::categories::get_category))
        // --- Applications ---
        .route(
            "/applications",
            post(handlers::applications::submit_application),
        )
        // POST /jobs/{id}/apply
        // Multipart form with a `resume` file part. The default 2MB body cap is replaced by
        // the configured upload limit.
        .route(
            "/jobs/{id}/apply",
            post(handlers::applications::apply_with_resume).layer(
                ServiceBuilder::new()
                    .layer(RequestBodyLimitLayer::new(
                        max_upload_bytes + FORM_FIELDS_ALLOWANCE,
                    ))
                    .layer(DefaultBodyLimit::disable()),
            ),
        )
        // --- Chat bot ---
        .route("/chat", post(handlers::assistant::chat))
}
