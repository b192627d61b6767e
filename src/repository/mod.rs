use std::{borrow::Cow, error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        ApplicationQuery, ApplicationStats, ApplicationStatus, CategoryChanges, DashboardStats,
        Job, JobApplication, JobCategory, JobChanges, NewApplication, NewCategory, NewJob,
        NewUser, Role, User, UserCredentials,
    },
    search::JobFilter,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, sqlx::Error>;

// Postgres' default names for the UNIQUE constraints in the schema migration.
pub const USER_EMAIL_KEY: &str = "users_email_key";
pub const CATEGORY_NAME_KEY: &str = "job_categories_name_key";
pub const APPLICATION_EMAIL_KEY: &str = "job_applications_job_id_applicant_email_key";

/// UniqueViolation
///
/// A `23505` database error naming the violated constraint. Raised by `MemoryRepository`
/// wherever Postgres would reject a duplicate row, so both stores fail the same way.
#[derive(Debug, Error)]
#[error("duplicate key value violates unique constraint \"{constraint}\"")]
pub struct UniqueViolation {
    constraint: &'static str,
}

impl UniqueViolation {
    pub fn error(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(UniqueViolation { constraint }))
    }
}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.constraint)
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

/// Repository Trait
///
/// Persistence contract shared by the Postgres store and the in-memory store used in tests.
/// Both implementations must apply identical filtering semantics.
///
/// **Send + Sync + async_trait** are required so `Arc<dyn Repository>` can live in the
/// axum state.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// Email is compared lower-cased.
    async fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<UserCredentials>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>>;

    // --- Categories ---
    /// Ordered by name, with `job_count` filled in.
    async fn list_categories(&self) -> RepoResult<Vec<JobCategory>>;
    async fn get_category(&self, id: i64) -> RepoResult<Option<JobCategory>>;
    /// True if another category (other than `except`) already uses `name`.
    async fn category_name_taken(&self, name: &str, except: Option<i64>) -> RepoResult<bool>;
    async fn create_category(&self, category: NewCategory) -> RepoResult<JobCategory>;
    async fn update_category(
        &self,
        id: i64,
        changes: CategoryChanges,
    ) -> RepoResult<Option<JobCategory>>;
    async fn delete_category(&self, id: i64) -> RepoResult<bool>;
    async fn jobs_in_category(&self, id: i64) -> RepoResult<Vec<Job>>;

    // --- Jobs ---
    /// Store-side filtering only (everything in `JobFilter::matches`), newest first.
    /// Salary range, ordering and paging are applied by `search::search`.
    async fn search_jobs(&self, filter: &JobFilter) -> RepoResult<Vec<Job>>;
    async fn get_job(&self, id: Uuid) -> RepoResult<Option<Job>>;
    async fn create_job(&self, job: NewJob, posted_by: Option<Uuid>) -> RepoResult<Job>;
    /// Partial update; `None` fields keep their stored value.
    async fn update_job(&self, id: Uuid, changes: JobChanges) -> RepoResult<Option<Job>>;
    async fn delete_job(&self, id: Uuid) -> RepoResult<bool>;
    async fn count_applications_for_job(&self, id: Uuid) -> RepoResult<i64>;

    // --- Applications ---
    async fn find_application_by_email(
        &self,
        job_id: Uuid,
        email: &str,
    ) -> RepoResult<Option<JobApplication>>;
    async fn create_application(&self, application: NewApplication) -> RepoResult<JobApplication>;
    async fn get_application(&self, id: Uuid) -> RepoResult<Option<JobApplication>>;
    /// Newest first.
    async fn list_applications(&self, query: &ApplicationQuery)
    -> RepoResult<Vec<JobApplication>>;
    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        admin_notes: Option<String>,
    ) -> RepoResult<Option<JobApplication>>;
    async fn delete_application(&self, id: Uuid) -> RepoResult<bool>;
    async fn application_stats(&self) -> RepoResult<ApplicationStats>;

    // --- Dashboard ---
    async fn get_stats(&self) -> RepoResult<DashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
