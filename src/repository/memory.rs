use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    APPLICATION_EMAIL_KEY, CATEGORY_NAME_KEY, RepoResult, Repository, USER_EMAIL_KEY,
    UniqueViolation,
};
use crate::{
    models::{
        ApplicationQuery, ApplicationStats, ApplicationStatus, CategoryChanges, DashboardStats,
        Job, JobApplication, JobApplicationCount, JobCategory, JobChanges, NewApplication,
        NewCategory, NewJob, NewUser, Role, StatusCount, User, UserCredentials,
    },
    search::JobFilter,
};

#[derive(Default)]
struct Store {
    users: Vec<UserCredentials>,
    categories: Vec<JobCategory>,
    jobs: Vec<Job>,
    applications: Vec<JobApplication>,
    next_category_id: i64,
}

impl Store {
    fn job_count(&self, category_id: i64) -> i64 {
        self.jobs
            .iter()
            .filter(|j| j.category_id == Some(category_id))
            .count() as i64
    }

    fn category_with_count(&self, category: &JobCategory) -> JobCategory {
        JobCategory {
            job_count: self.job_count(category.id),
            ..category.clone()
        }
    }
}

/// MemoryRepository
///
/// Process-local `Repository` used by the test suites. Mirrors the Postgres schema's
/// constraints: deleting a job removes its applications, and duplicate user emails,
/// category names and per-job applicant emails fail with a `23505` `UniqueViolation`.
#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> chrono::DateTime<Utc>) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let email = user.email.to_lowercase();
        let mut store = self.store.write().await;
        if store.users.iter().any(|u| u.email == email) {
            return Err(UniqueViolation::error(USER_EMAIL_KEY));
        }
        let record = UserCredentials {
            id: Uuid::new_v4(),
            name: user.name,
            email,
            role: user.role.as_str().to_string(),
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        store.users.push(record.clone());
        Ok(record.into())
    }

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .map(User::from))
    }

    async fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        let email = email.to_lowercase();
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let store = self.store.read().await;
        let mut users: Vec<User> = store.users.iter().cloned().map(User::from).collect();
        newest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let mut store = self.store.write().await;
        Ok(store.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role.as_str().to_string();
            User::from(u.clone())
        }))
    }

    async fn list_categories(&self) -> RepoResult<Vec<JobCategory>> {
        let store = self.store.read().await;
        let mut categories: Vec<JobCategory> = store
            .categories
            .iter()
            .map(|c| store.category_with_count(c))
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> RepoResult<Option<JobCategory>> {
        let store = self.store.read().await;
        Ok(store
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| store.category_with_count(c)))
    }

    async fn category_name_taken(&self, name: &str, except: Option<i64>) -> RepoResult<bool> {
        let store = self.store.read().await;
        Ok(store
            .categories
            .iter()
            .any(|c| c.name == name && Some(c.id) != except))
    }

    async fn create_category(&self, category: NewCategory) -> RepoResult<JobCategory> {
        let mut store = self.store.write().await;
        if store.categories.iter().any(|c| c.name == category.name) {
            return Err(UniqueViolation::error(CATEGORY_NAME_KEY));
        }
        store.next_category_id += 1;
        let now = Utc::now();
        let record = JobCategory {
            id: store.next_category_id,
            name: category.name,
            description: category.description,
            job_count: 0,
            created_at: now,
            updated_at: now,
        };
        store.categories.push(record.clone());
        Ok(record)
    }

    async fn update_category(
        &self,
        id: i64,
        changes: CategoryChanges,
    ) -> RepoResult<Option<JobCategory>> {
        let mut store = self.store.write().await;
        if let Some(name) = &changes.name {
            if store.categories.iter().any(|c| c.id != id && &c.name == name) {
                return Err(UniqueViolation::error(CATEGORY_NAME_KEY));
            }
        }
        let Some(category) = store.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            category.name = name;
        }
        if let Some(description) = changes.description {
            category.description = Some(description);
        }
        category.updated_at = Utc::now();
        let updated = category.clone();
        Ok(Some(store.category_with_count(&updated)))
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.categories.len();
        store.categories.retain(|c| c.id != id);
        Ok(store.categories.len() < before)
    }

    async fn jobs_in_category(&self, id: i64) -> RepoResult<Vec<Job>> {
        let store = self.store.read().await;
        let mut jobs: Vec<Job> = store
            .jobs
            .iter()
            .filter(|j| j.category_id == Some(id))
            .cloned()
            .collect();
        newest_first(&mut jobs, |j| j.posted_date);
        Ok(jobs)
    }

    async fn search_jobs(&self, filter: &JobFilter) -> RepoResult<Vec<Job>> {
        let now = Utc::now();
        let store = self.store.read().await;
        let mut jobs: Vec<Job> = store
            .jobs
            .iter()
            .filter(|j| filter.matches(j, now))
            .cloned()
            .collect();
        newest_first(&mut jobs, |j| j.posted_date);
        Ok(jobs)
    }

    async fn get_job(&self, id: Uuid) -> RepoResult<Option<Job>> {
        let store = self.store.read().await;
        Ok(store.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn create_job(&self, job: NewJob, posted_by: Option<Uuid>) -> RepoResult<Job> {
        let now = Utc::now();
        let record = Job {
            id: Uuid::new_v4(),
            title: job.title,
            description: job.description,
            company: job.company,
            location: job.location,
            salary: job.salary,
            job_type: job.job_type.as_str().to_string(),
            category_id: job.category_id,
            requirements: job.requirements,
            is_remote: job.is_remote,
            posted_by,
            posted_date: now,
            application_deadline: job.application_deadline,
            created_at: now,
            updated_at: now,
        };
        self.store.write().await.jobs.push(record.clone());
        Ok(record)
    }

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> RepoResult<Option<Job>> {
        let mut store = self.store.write().await;
        let Some(job) = store.jobs.iter_mut().find(|j| j.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            job.title = v;
        }
        if let Some(v) = changes.description {
            job.description = v;
        }
        if let Some(v) = changes.company {
            job.company = v;
        }
        if let Some(v) = changes.location {
            job.location = v;
        }
        if let Some(v) = changes.salary {
            job.salary = Some(v);
        }
        if let Some(v) = changes.job_type {
            job.job_type = v.as_str().to_string();
        }
        if let Some(v) = changes.category_id {
            job.category_id = Some(v);
        }
        if let Some(v) = changes.requirements {
            job.requirements = v;
        }
        if let Some(v) = changes.is_remote {
            job.is_remote = v;
        }
        if let Some(v) = changes.application_deadline {
            job.application_deadline = Some(v);
        }
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn delete_job(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.jobs.len();
        store.jobs.retain(|j| j.id != id);
        let removed = store.jobs.len() < before;
        if removed {
            store.applications.retain(|a| a.job_id != id);
        }
        Ok(removed)
    }

    async fn count_applications_for_job(&self, id: Uuid) -> RepoResult<i64> {
        let store = self.store.read().await;
        Ok(store.applications.iter().filter(|a| a.job_id == id).count() as i64)
    }

    async fn find_application_by_email(
        &self,
        job_id: Uuid,
        email: &str,
    ) -> RepoResult<Option<JobApplication>> {
        let email = email.to_lowercase();
        let store = self.store.read().await;
        Ok(store
            .applications
            .iter()
            .find(|a| a.job_id == job_id && a.applicant_email == email)
            .cloned())
    }

    async fn create_application(&self, application: NewApplication) -> RepoResult<JobApplication> {
        let applicant_email = application.applicant_email.to_lowercase();
        let mut store = self.store.write().await;
        if store
            .applications
            .iter()
            .any(|a| a.job_id == application.job_id && a.applicant_email == applicant_email)
        {
            return Err(UniqueViolation::error(APPLICATION_EMAIL_KEY));
        }
        let now = Utc::now();
        let resume = application.resume;
        let record = JobApplication {
            id: Uuid::new_v4(),
            job_id: application.job_id,
            user_id: application.user_id,
            applicant_name: application.applicant_name,
            applicant_email,
            phone: application.phone,
            resume_url: application.resume_url,
            resume_file: resume.as_ref().map(|r| r.key.clone()),
            resume_original_name: resume.as_ref().map(|r| r.original_name.clone()),
            resume_size: resume.as_ref().map(|r| r.size),
            resume_mime: resume.as_ref().map(|r| r.mime.clone()),
            cover_letter: application.cover_letter,
            status: ApplicationStatus::Pending.as_str().to_string(),
            admin_notes: None,
            applied_at: now,
            updated_at: now,
        };
        store.applications.push(record.clone());
        Ok(record)
    }

    async fn get_application(&self, id: Uuid) -> RepoResult<Option<JobApplication>> {
        let store = self.store.read().await;
        Ok(store.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn list_applications(
        &self,
        query: &ApplicationQuery,
    ) -> RepoResult<Vec<JobApplication>> {
        let store = self.store.read().await;
        let mut applications: Vec<JobApplication> = store
            .applications
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        newest_first(&mut applications, |a| a.applied_at);
        Ok(applications)
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        admin_notes: Option<String>,
    ) -> RepoResult<Option<JobApplication>> {
        let mut store = self.store.write().await;
        Ok(store.applications.iter_mut().find(|a| a.id == id).map(|a| {
            a.status = status.as_str().to_string();
            if admin_notes.is_some() {
                a.admin_notes = admin_notes;
            }
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn delete_application(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.applications.len();
        store.applications.retain(|a| a.id != id);
        Ok(store.applications.len() < before)
    }

    async fn application_stats(&self) -> RepoResult<ApplicationStats> {
        let store = self.store.read().await;

        let mut by_status: BTreeMap<&str, i64> = BTreeMap::new();
        let mut by_job: BTreeMap<Uuid, i64> = BTreeMap::new();
        for a in &store.applications {
            *by_status.entry(a.status.as_str()).or_default() += 1;
            *by_job.entry(a.job_id).or_default() += 1;
        }

        let status_breakdown = by_status
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect();

        let mut job_breakdown: Vec<JobApplicationCount> = by_job
            .into_iter()
            .filter_map(|(job_id, count)| {
                store
                    .jobs
                    .iter()
                    .find(|j| j.id == job_id)
                    .map(|j| JobApplicationCount {
                        job_id,
                        title: j.title.clone(),
                        count,
                    })
            })
            .collect();
        job_breakdown.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.title.cmp(&b.title)));

        Ok(ApplicationStats {
            total_applications: store.applications.len() as i64,
            status_breakdown,
            job_breakdown,
        })
    }

    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        let store = self.store.read().await;
        Ok(DashboardStats {
            total_jobs: store.jobs.len() as i64,
            total_applications: store.applications.len() as i64,
            total_users: store.users.len() as i64,
            total_categories: store.categories.len() as i64,
            pending_applications: store
                .applications
                .iter()
                .filter(|a| a.status == ApplicationStatus::Pending.as_str())
                .count() as i64,
        })
    }
}
