use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{RepoResult, Repository};
use crate::{
    models::{
        ApplicationQuery, ApplicationStats, ApplicationStatus, CategoryChanges, DashboardStats,
        Job, JobApplication, JobApplicationCount, JobCategory, JobChanges, NewApplication,
        NewCategory, NewJob, NewUser, Role, StatusCount, User, UserCredentials,
    },
    search::JobFilter,
};

const USER_COLUMNS: &str = "id, name, email, role, created_at";

const JOB_COLUMNS: &str = "id, title, description, company, location, salary, job_type, \
     category_id, requirements, is_remote, posted_by, posted_date, application_deadline, \
     created_at, updated_at";

const APPLICATION_COLUMNS: &str = "id, job_id, user_id, applicant_name, applicant_email, phone, \
     resume_url, resume_file, resume_original_name, resume_size, resume_mime, cover_letter, \
     status, admin_notes, applied_at, updated_at";

const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.description, c.created_at, c.updated_at, \
     (SELECT COUNT(*) FROM job_listings j WHERE j.category_id = c.id) AS job_count \
     FROM job_categories c";

/// `%term%` with LIKE wildcards in `term` escaped, for `ILIKE ... ESCAPE '\'`.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are built at runtime so the crate compiles
/// without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role, created_at) \
             VALUES ($1, $2, LOWER($3), $4, $5, NOW()) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
    }

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        sqlx::query_as::<_, UserCredentials>(
            "SELECT id, name, email, role, password_hash, created_at FROM users \
             WHERE email = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> RepoResult<Vec<JobCategory>> {
        sqlx::query_as::<_, JobCategory>(&format!("{CATEGORY_SELECT} ORDER BY c.name"))
            .fetch_all(&self.pool)
            .await
    }

    async fn get_category(&self, id: i64) -> RepoResult<Option<JobCategory>> {
        sqlx::query_as::<_, JobCategory>(&format!("{CATEGORY_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn category_name_taken(&self, name: &str, except: Option<i64>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM job_categories \
             WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_category(&self, category: NewCategory) -> RepoResult<JobCategory> {
        sqlx::query_as::<_, JobCategory>(
            "INSERT INTO job_categories (name, description, created_at, updated_at) \
             VALUES ($1, $2, NOW(), NOW()) \
             RETURNING id, name, description, created_at, updated_at, 0::BIGINT AS job_count",
        )
        .bind(category.name)
        .bind(category.description)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_category(
        &self,
        id: i64,
        changes: CategoryChanges,
    ) -> RepoResult<Option<JobCategory>> {
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE job_categories SET name = COALESCE($2, name), \
             description = COALESCE($3, description), updated_at = NOW() \
             WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.get_category(id).await,
            None => Ok(None),
        }
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM job_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn jobs_in_category(&self, id: i64) -> RepoResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM job_listings WHERE category_id = $1 \
             ORDER BY posted_date DESC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
    }

    // --- JOBS ---

    /// search_jobs
    ///
    /// Builds the WHERE clause with QueryBuilder so every user-supplied value is bound.
    async fn search_jobs(&self, filter: &JobFilter) -> RepoResult<Vec<Job>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM job_listings WHERE TRUE"));

        if let Some(q) = filter.text() {
            let pattern = like_pattern(q);
            builder.push(" AND (");
            for (i, column) in ["title", "description", "company", "location"]
                .iter()
                .enumerate()
            {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push(format!("{column} ILIKE "));
                builder.push_bind(pattern.clone());
                builder.push(" ESCAPE '\\'");
            }
            builder.push(")");
        }
        if let Some(location) = filter.location() {
            builder.push(" AND location ILIKE ");
            builder.push_bind(like_pattern(location));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(company) = filter.company() {
            builder.push(" AND company ILIKE ");
            builder.push_bind(like_pattern(company));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(job_type) = filter.job_type() {
            builder.push(" AND LOWER(job_type) = LOWER(");
            builder.push_bind(job_type.to_string());
            builder.push(")");
        }
        if let Some(category_id) = filter.category_id {
            builder.push(" AND category_id = ");
            builder.push_bind(category_id);
        }
        if let Some(salary) = filter.salary_pattern() {
            builder.push(" AND salary ILIKE ");
            builder.push_bind(like_pattern(salary));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(remote) = filter.remote {
            builder.push(" AND is_remote = ");
            builder.push_bind(remote);
        }
        if let Some(since) = filter.posted_since(Utc::now()) {
            builder.push(" AND posted_date >= ");
            builder.push_bind(since);
        }

        builder.push(" ORDER BY posted_date DESC");

        builder.build_query_as::<Job>().fetch_all(&self.pool).await
    }

    async fn get_job(&self, id: Uuid) -> RepoResult<Option<Job>> {
        sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM job_listings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_job(&self, job: NewJob, posted_by: Option<Uuid>) -> RepoResult<Job> {
        sqlx::query_as::<_, Job>(&format!(
            "INSERT INTO job_listings (id, title, description, company, location, salary, \
             job_type, category_id, requirements, is_remote, posted_by, posted_date, \
             application_deadline, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), $12, NOW(), NOW()) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(job.title)
        .bind(job.description)
        .bind(job.company)
        .bind(job.location)
        .bind(job.salary)
        .bind(job.job_type.as_str())
        .bind(job.category_id)
        .bind(job.requirements)
        .bind(job.is_remote)
        .bind(posted_by)
        .bind(job.application_deadline)
        .fetch_one(&self.pool)
        .await
    }

    /// update_job
    ///
    /// COALESCE keeps the stored value for every field the caller left out.
    async fn update_job(&self, id: Uuid, changes: JobChanges) -> RepoResult<Option<Job>> {
        sqlx::query_as::<_, Job>(&format!(
            "UPDATE job_listings SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                company = COALESCE($4, company), \
                location = COALESCE($5, location), \
                salary = COALESCE($6, salary), \
                job_type = COALESCE($7, job_type), \
                category_id = COALESCE($8, category_id), \
                requirements = COALESCE($9, requirements), \
                is_remote = COALESCE($10, is_remote), \
                application_deadline = COALESCE($11, application_deadline), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.company)
        .bind(changes.location)
        .bind(changes.salary)
        .bind(changes.job_type.map(|t| t.as_str()))
        .bind(changes.category_id)
        .bind(changes.requirements)
        .bind(changes.is_remote)
        .bind(changes.application_deadline)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_job(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM job_listings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_applications_for_job(&self, id: Uuid) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM job_applications WHERE job_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    // --- APPLICATIONS ---

    async fn find_application_by_email(
        &self,
        job_id: Uuid,
        email: &str,
    ) -> RepoResult<Option<JobApplication>> {
        sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications \
             WHERE job_id = $1 AND applicant_email = LOWER($2)"
        ))
        .bind(job_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_application(&self, application: NewApplication) -> RepoResult<JobApplication> {
        let resume = application.resume;
        sqlx::query_as::<_, JobApplication>(&format!(
            "INSERT INTO job_applications (id, job_id, user_id, applicant_name, applicant_email, \
             phone, resume_url, resume_file, resume_original_name, resume_size, resume_mime, \
             cover_letter, status, applied_at, updated_at) \
             VALUES ($1, $2, $3, $4, LOWER($5), $6, $7, $8, $9, $10, $11, $12, 'pending', NOW(), NOW()) \
             RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(application.job_id)
        .bind(application.user_id)
        .bind(application.applicant_name)
        .bind(application.applicant_email)
        .bind(application.phone)
        .bind(application.resume_url)
        .bind(resume.as_ref().map(|r| r.key.clone()))
        .bind(resume.as_ref().map(|r| r.original_name.clone()))
        .bind(resume.as_ref().map(|r| r.size))
        .bind(resume.as_ref().map(|r| r.mime.clone()))
        .bind(application.cover_letter)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_application(&self, id: Uuid) -> RepoResult<Option<JobApplication>> {
        sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_applications(
        &self,
        query: &ApplicationQuery,
    ) -> RepoResult<Vec<JobApplication>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE TRUE"
        ));
        if let Some(job_id) = query.job_id {
            builder.push(" AND job_id = ");
            builder.push_bind(job_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ");
            builder.push_bind(user_id);
        }
        builder.push(" ORDER BY applied_at DESC");

        builder
            .build_query_as::<JobApplication>()
            .fetch_all(&self.pool)
            .await
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        admin_notes: Option<String>,
    ) -> RepoResult<Option<JobApplication>> {
        sqlx::query_as::<_, JobApplication>(&format!(
            "UPDATE job_applications SET status = $2, \
             admin_notes = COALESCE($3, admin_notes), updated_at = NOW() \
             WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(admin_notes)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_application(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM job_applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn application_stats(&self) -> RepoResult<ApplicationStats> {
        let total_applications =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM job_applications")
                .fetch_one(&self.pool)
                .await?;

        let status_breakdown = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM job_applications \
             GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let job_breakdown = sqlx::query_as::<_, JobApplicationCount>(
            "SELECT a.job_id, j.title, COUNT(*) AS count FROM job_applications a \
             JOIN job_listings j ON j.id = a.job_id \
             GROUP BY a.job_id, j.title ORDER BY count DESC, j.title",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ApplicationStats {
            total_applications,
            status_breakdown,
            job_breakdown,
        })
    }

    // --- DASHBOARD ---

    /// get_stats
    ///
    /// All dashboard counters in a single round trip.
    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        let (total_jobs, total_applications, total_users, total_categories, pending_applications) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                "SELECT \
                    (SELECT COUNT(*) FROM job_listings), \
                    (SELECT COUNT(*) FROM job_applications), \
                    (SELECT COUNT(*) FROM users), \
                    (SELECT COUNT(*) FROM job_categories), \
                    (SELECT COUNT(*) FROM job_applications WHERE status = 'pending')",
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_jobs,
            total_applications,
            total_users,
            total_categories,
            pending_applications,
        })
    }
}
