#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use async_trait::async_trait;
use jobboard_api::{
    AppState, MemoryRepository, MockStorageService, RepositoryState,
    assistant::TemplateDescriptionGenerator,
    auth,
    config::AppConfig,
    create_router,
    models::{
        ApplicationQuery, ApplicationStats, ApplicationStatus, CategoryChanges, DashboardStats,
        Job, JobApplication, JobCategory, JobChanges, JobType, NewApplication, NewCategory,
        NewJob, NewUser, Role, User, UserCredentials,
    },
    repository::{RepoResult, Repository},
    search::JobFilter,
};
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
pub const TEST_PASSWORD: &str = "password123";
pub const BOUNDARY: &str = "jobboard-test-boundary";

/// In-process application over the in-memory repository and mock storage.
pub struct TestApp {
    pub repo: Arc<MemoryRepository>,
    pub storage: MockStorageService,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            ..AppConfig::default()
        })
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            repo: Arc::new(MemoryRepository::new()),
            storage: MockStorageService::new(),
            config,
        }
    }

    pub fn with_storage(mut self, storage: MockStorageService) -> Self {
        self.storage = storage;
        self
    }

    pub fn state(&self) -> AppState {
        AppState {
            repo: self.repo.clone(),
            storage: Arc::new(self.storage.clone()),
            ai: Arc::new(TemplateDescriptionGenerator),
            config: self.config.clone(),
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state())
    }

    /// Router whose handlers see `repo` instead of `self.repo`.
    pub fn router_with_repo(&self, repo: RepositoryState) -> Router {
        create_router(AppState {
            repo,
            ..self.state()
        })
    }

    pub async fn user(&self, role: Role) -> User {
        self.repo
            .create_user(NewUser {
                name: format!("Test {}", role.as_str()),
                email: format!("{}-{}@example.com", role.as_str(), Uuid::new_v4()),
                password_hash: auth::hash_password(TEST_PASSWORD).unwrap(),
                role,
            })
            .await
            .unwrap()
    }

    pub fn token(&self, user: &User) -> String {
        auth::issue_token(user, &self.config).unwrap().access_token
    }

    pub async fn job(&self, owner: &User, title: &str) -> Job {
        self.repo
            .create_job(new_job(title), Some(owner.id))
            .await
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    /// JSON request, optionally authenticated; returns the status and decoded body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn new_job(title: &str) -> NewJob {
    NewJob {
        title: title.to_string(),
        description: "Build and operate distributed services in a small product team.".to_string(),
        company: "Acme Corp".to_string(),
        location: "Berlin".to_string(),
        salary: Some("$80,000 - $100,000".to_string()),
        job_type: JobType::FullTime,
        category_id: None,
        requirements: vec!["Rust".to_string(), "SQL".to_string()],
        is_remote: false,
        application_deadline: None,
    }
}

pub fn job_payload() -> Value {
    serde_json::json!({
        "title": "Senior Rust Engineer",
        "description": "Design, build and run the services behind our job matching platform at scale.",
        "company": "Acme Corp",
        "location": "Remote",
        "salary": "$100,000 - $150,000",
        "job_type": "full-time",
        "requirements": ["Rust", "  ", "PostgreSQL"],
        "is_remote": true
    })
}

/// Hand-built `multipart/form-data` body using `BOUNDARY`.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Repository whose duplicate-application lookup misses once while armed, as if a concurrent
/// request inserted the same applicant between the check and the insert.
pub struct StaleDuplicateCheck {
    inner: Arc<MemoryRepository>,
    armed: AtomicBool,
}

impl StaleDuplicateCheck {
    pub fn new(inner: Arc<MemoryRepository>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Repository for StaleDuplicateCheck {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        self.inner.create_user(user).await
    }
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        self.inner.find_user(id).await
    }
    async fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        self.inner.find_credentials_by_email(email).await
    }
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        self.inner.list_users().await
    }
    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        self.inner.set_user_role(id, role).await
    }

    async fn list_categories(&self) -> RepoResult<Vec<JobCategory>> {
        self.inner.list_categories().await
    }
    async fn get_category(&self, id: i64) -> RepoResult<Option<JobCategory>> {
        self.inner.get_category(id).await
    }
    async fn category_name_taken(&self, name: &str, except: Option<i64>) -> RepoResult<bool> {
        self.inner.category_name_taken(name, except).await
    }
    async fn create_category(&self, category: NewCategory) -> RepoResult<JobCategory> {
        self.inner.create_category(category).await
    }
    async fn update_category(
        &self,
        id: i64,
        changes: CategoryChanges,
    ) -> RepoResult<Option<JobCategory>> {
        self.inner.update_category(id, changes).await
    }
    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        self.inner.delete_category(id).await
    }
    async fn jobs_in_category(&self, id: i64) -> RepoResult<Vec<Job>> {
        self.inner.jobs_in_category(id).await
    }

    async fn search_jobs(&self, filter: &JobFilter) -> RepoResult<Vec<Job>> {
        self.inner.search_jobs(filter).await
    }
    async fn get_job(&self, id: Uuid) -> RepoResult<Option<Job>> {
        self.inner.get_job(id).await
    }
    async fn create_job(&self, job: NewJob, posted_by: Option<Uuid>) -> RepoResult<Job> {
        self.inner.create_job(job, posted_by).await
    }
    async fn update_job(&self, id: Uuid, changes: JobChanges) -> RepoResult<Option<Job>> {
        self.inner.update_job(id, changes).await
    }
    async fn delete_job(&self, id: Uuid) -> RepoResult<bool> {
        self.inner.delete_job(id).await
    }
    async fn count_applications_for_job(&self, id: Uuid) -> RepoResult<i64> {
        self.inner.count_applications_for_job(id).await
    }

    async fn find_application_by_email(
        &self,
        job_id: Uuid,
        email: &str,
    ) -> RepoResult<Option<JobApplication>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_application_by_email(job_id, email).await
    }
    async fn create_application(&self, application: NewApplication) -> RepoResult<JobApplication> {
        self.inner.create_application(application).await
    }
    async fn get_application(&self, id: Uuid) -> RepoResult<Option<JobApplication>> {
        self.inner.get_application(id).await
    }
    async fn list_applications(
        &self,
        query: &ApplicationQuery,
    ) -> RepoResult<Vec<JobApplication>> {
        self.inner.list_applications(query).await
    }
    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        admin_notes: Option<String>,
    ) -> RepoResult<Option<JobApplication>> {
        self.inner
            .update_application_status(id, status, admin_notes)
            .await
    }
    async fn delete_application(&self, id: Uuid) -> RepoResult<bool> {
        self.inner.delete_application(id).await
    }
    async fn application_stats(&self) -> RepoResult<ApplicationStats> {
        self.inner.application_stats().await
    }

    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        self.inner.get_stats().await
    }
}
