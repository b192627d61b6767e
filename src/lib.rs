use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain rules, independent of HTTP and storage.
pub mod models;
pub mod salary;
pub mod search;
pub mod validation;

// Services and infrastructure.
pub mod assistant;
pub mod auth;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod repository;
pub mod storage;

// HTTP layer.
pub mod handlers;
pub mod routes;

use auth::AuthUser;
use errors::ApiError;
use models::Role;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use assistant::GeneratorState;
pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document assembled from every `#[utoipa::path]` handler and `ToSchema` model.
/// Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::register, handlers::auth::login, handlers::auth::get_me,
        handlers::jobs::list_jobs, handlers::jobs::get_job, handlers::jobs::create_job,
        handlers::jobs::validate_job, handlers::jobs::update_job, handlers::jobs::delete_job,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::applications::submit_application, handlers::applications::apply_with_resume,
        handlers::applications::list_applications, handlers::applications::get_application,
        handlers::applications::update_application_status,
        handlers::applications::delete_application, handlers::applications::job_applications,
        handlers::applications::my_applications, handlers::applications::application_stats,
        handlers::applications::download_resume,
        handlers::assistant::generate_description, handlers::assistant::chat,
        handlers::admin::list_users, handlers::admin::update_user_role, handlers::admin::get_stats,
    ),
    components(
        schemas(
            models::User, models::Role, models::Job, models::JobType, models::JobSummary,
            models::NewJob, models::JobCategory, models::JobApplication,
            models::ApplicationStatus, models::Pagination, models::DashboardStats,
            models::ApplicationStats, models::StatusCount, models::JobApplicationCount,
            validation::JobPayload, validation::ApplicationPayload, validation::StatusPayload,
            validation::CategoryPayload, validation::RegisterPayload, validation::LoginPayload,
            validation::RolePayload,
            auth::AuthToken,
            assistant::DescriptionRequest, assistant::GeneratedDescription, assistant::ChatPayload,
            handlers::categories::CategoryDetail, handlers::applications::ApplicationDetail,
            handlers::applications::ResumeUploadForm, handlers::assistant::ChatReply,
        )
    ),
    tags(
        (name = "jobboard", description = "Job Board API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Single shared container for every service a handler may need. Cloned per request;
/// all members are cheap `Arc` handles or plain config.
#[derive(Clone)]
pub struct AppState {
    /// Postgres in production, `MemoryRepository` in tests.
    pub repo: RepositoryState,
    /// Resume and chat transcript storage.
    pub storage: StorageState,
    /// Job description generator.
    pub ai: GeneratorState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for GeneratorState {
    fn from_ref(app_state: &AppState) -> GeneratorState {
        app_state.ai.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`. Extracting `AuthUser` is the whole check: a missing,
/// malformed or expired token rejects the request with 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_middleware
///
/// Guards `/admin`: 401 without credentials, 403 for any role other than `admin`.
async fn admin_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    auth_user.require_any(&[Role::Admin])?;
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles the routers, the documentation endpoints and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes(state.config.max_upload_bytes))
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_middleware,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Every request gets an x-request-id.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One span per request, carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo the id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set by the layer above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
