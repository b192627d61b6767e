use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerated vocabularies ---
//
// Stored as TEXT columns and compared as strings; these enums are the single source of the
// accepted spellings.

/// Role
///
/// Access level attached to every user. Route guards compare the stored role string against
/// the roles a route allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Company,
    Freelancer,
    Client,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Company, Role::Freelancer, Role::Client];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Company => "company",
            Role::Freelancer => "freelancer",
            Role::Client => "client",
        }
    }

    /// Roles a visitor may choose for themselves at registration.
    pub fn self_assignable(self) -> bool {
        !matches!(self, Role::Admin)
    }
}

/// JobType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Internship,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Freelance,
        JobType::Internship,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::FullTime => "full-time",
            JobType::PartTime => "part-time",
            JobType::Contract => "contract",
            JobType::Freelance => "freelance",
            JobType::Internship => "internship",
        }
    }
}

/// ApplicationStatus
///
/// Review state of an application. Every application starts as `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Error returned when a string is not one of an enum's accepted spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

macro_rules! text_enum {
    ($ty:ty) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| UnknownVariant(s.to_string()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(Role);
text_enum!(JobType);
text_enum!(ApplicationStatus);

// --- Persisted records ---

/// User
///
/// Public view of a row in `users`. The password hash lives only in `UserCredentials`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserCredentials
///
/// Internal row used by login; never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserCredentials> for User {
    fn from(c: UserCredentials) -> Self {
        User {
            id: c.id,
            name: c.name,
            email: c.email,
            role: c.role,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// JobCategory
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct JobCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    // Filled by the listing query's LEFT JOIN; zero when not computed.
    #[sqlx(default)]
    pub job_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CategoryChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Job
///
/// A row in `job_listings`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub job_type: String,
    pub category_id: Option<i64>,
    pub requirements: Vec<String>,
    pub is_remote: bool,
    pub posted_by: Option<Uuid>,
    #[ts(type = "string")]
    pub posted_date: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub application_deadline: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// JobSummary
///
/// Compact job projection embedded in category and application responses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub job_type: String,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        JobSummary {
            id: job.id,
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            salary: job.salary.clone(),
            job_type: job.job_type.clone(),
        }
    }
}

/// NewJob
///
/// Cleaned, validated job data ready for insertion.
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub job_type: JobType,
    pub category_id: Option<i64>,
    pub requirements: Vec<String>,
    pub is_remote: bool,
    pub application_deadline: Option<DateTime<Utc>>,
}

/// JobChanges
///
/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct JobChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<JobType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_remote: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<DateTime<Utc>>,
}

impl JobChanges {
    /// Names of the fields this update touches, sorted.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}

/// JobApplication
///
/// A row in `job_applications`. Either `resume_url` (JSON submission) or the `resume_*`
/// file columns (multipart submission) are populated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Option<Uuid>,
    pub applicant_name: String,
    pub applicant_email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub resume_file: Option<String>,
    pub resume_original_name: Option<String>,
    pub resume_size: Option<i64>,
    pub resume_mime: Option<String>,
    pub cover_letter: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    #[ts(type = "string")]
    pub applied_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Metadata of a resume stored through the storage service.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeFile {
    pub key: String,
    pub original_name: String,
    pub size: i64,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub user_id: Option<Uuid>,
    pub applicant_name: String,
    pub applicant_email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub resume: Option<ResumeFile>,
    pub cover_letter: Option<String>,
}

/// ApplicationQuery
///
/// Filters for listing applications. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct ApplicationQuery {
    pub job_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
    pub user_id: Option<Uuid>,
}

impl ApplicationQuery {
    pub fn matches(&self, app: &JobApplication) -> bool {
        self.job_id.is_none_or(|id| app.job_id == id)
            && self.status.is_none_or(|s| app.status == s.as_str())
            && self.user_id.is_none_or(|u| app.user_id == Some(u))
    }
}

// --- Output schemas ---

/// Pagination
///
/// Page metadata attached to paginated listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Default)]
#[ts(export)]
pub struct Pagination {
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// DashboardStats
///
/// Counters for the admin dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct DashboardStats {
    pub total_jobs: i64,
    pub total_applications: i64,
    pub total_users: i64,
    pub total_categories: i64,
    pub pending_applications: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct JobApplicationCount {
    pub job_id: Uuid,
    pub title: String,
    pub count: i64,
}

/// ApplicationStats
///
/// Output of GET /applications/stats/summary.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ApplicationStats {
    pub total_applications: i64,
    pub status_breakdown: Vec<StatusCount>,
    pub job_breakdown: Vec<JobApplicationCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("Full-Time".parse::<JobType>(), Ok(JobType::FullTime));
        assert_eq!(" company ".parse::<Role>(), Ok(Role::Company));
        assert_eq!("REVIEWED".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Reviewed));
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn enum_serde_matches_as_str() {
        for t in JobType::ALL {
            assert_eq!(serde_json::to_value(t).unwrap(), t.as_str());
        }
        for s in ApplicationStatus::ALL {
            assert_eq!(serde_json::to_value(s).unwrap(), s.as_str());
        }
    }

    #[test]
    fn admin_is_not_self_assignable() {
        assert!(!Role::Admin.self_assignable());
        assert!(Role::Client.self_assignable());
    }

    #[test]
    fn job_changes_lists_touched_fields() {
        let changes = JobChanges {
            title: Some("Rust Engineer".into()),
            is_remote: Some(true),
            ..JobChanges::default()
        };
        assert_eq!(changes.field_names(), vec!["is_remote", "title"]);
        assert!(JobChanges::default().is_empty());
    }

    #[test]
    fn application_query_filters() {
        let job_id = Uuid::new_v4();
        let app = JobApplication {
            job_id,
            status: "pending".into(),
            ..JobApplication::default()
        };
        assert!(ApplicationQuery::default().matches(&app));
        assert!(
            ApplicationQuery {
                job_id: Some(job_id),
                status: Some(ApplicationStatus::Pending),
                user_id: None
            }
            .matches(&app)
        );
        assert!(
            !ApplicationQuery {
                status: Some(ApplicationStatus::Accepted),
                ..ApplicationQuery::default()
            }
            .matches(&app)
        );
    }
}
