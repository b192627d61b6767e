use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes that require a valid access token. The `auth_middleware` layered on this router
/// rejects anonymous callers with 401 before any handler runs.
///
/// Role checks are finer grained than the router split, so they live in the handlers:
/// - company or admin: posting jobs, reviewing applications, downloading resumes
/// - job owner or admin: editing, deleting and listing applications of a job
/// - admin: category management and deleting applications
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Profile ---
        .route("/me", get(handlers::auth::get_me))
        .route(
            "/me/applications",
            get(handlers::applications::my_applications),
        )
        // --- Jobs ---
        .route("/jobs", post(handlers::jobs::create_job))
        // PUT/DELETE /jobs/{id}
        // Ownership is checked against `posted_by`.
        .route(
            "/jobs/{id}",
            put(handlers::jobs::update_job).delete(handlers::jobs::delete_job),
        )
        .route(
            "/jobs/{id}/applications",
            get(handlers::applications::job_applications),
        )
        // --- Categories (admin) ---
        .route("/categories", post(handlers::categories::create_category))
        .route(
            "/categories/{id}",
            put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        // --- Applications ---
        .route(
            "/applications",
            get(handlers::applications::list_applications),
        )
        .route(
            "/applications/stats/summary",
            get(handlers::applications::application_stats),
        )
        .route(
            "/applications/{id}",
            get(handlers::applications::get_application)
                .delete(handlers::applications::delete_application),
        )
        .route(
            "/applications/{id}/status",
            put(handlers::applications::update_application_status),
        )
        // GET /resumes/{filename}
        // Served as an attachment; directory segments in the name are discarded.
        .route(
            "/resumes/{filename}",
            get(handlers::applications::download_resume),
        )
        // --- Assistant ---
        .route(
            "/ai/generate-description",
            post(handlers::assistant::generate_description),
        )
}
