use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Nested under `/admin`. The whole router is wrapped in `admin_middleware`, which
/// authenticates the caller and requires the `admin` role before any handler runs.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        .route("/users", get(handlers::admin::list_users))
        // PUT /admin/users/{id}/role
        // The only path that can grant `admin`; registration refuses it.
        .route("/users/{id}/role", put(handlers::admin::update_user_role))
        // GET /admin/stats
        // Totals of jobs, applications, users and categories plus pending applications.
        .route("/stats", get(handlers::admin::get_stats))
}
