//! Request payloads and their validation rules.
//!
//! Every validator collects all failures for all fields before returning, so a client sees
//! the complete list of problems in one 422 response.

use std::collections::BTreeMap;

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::{
        ApplicationStatus, CategoryChanges, JobChanges, JobType, NewCategory, NewJob, Role,
    },
    salary,
};

static TITLE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s\-\./\(\)]+$").expect("title pattern compiles"));
static COMPANY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s\-\.&]+$").expect("company pattern compiles"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").expect("phone pattern compiles"));
static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").expect("url pattern compiles"));

/// ValidationErrors
///
/// Field name → messages, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Ok(value) if nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

/// Length and pattern constraints for one text field, with its messages.
struct TextRule {
    field: &'static str,
    required: &'static str,
    min: usize,
    min_msg: &'static str,
    max: usize,
    max_msg: &'static str,
    pattern: Option<(&'static Lazy<Regex>, &'static str)>,
}

impl TextRule {
    /// Trims and checks `value`. Absent or blank input records the `required` message.
    fn check(&self, value: Option<&str>, errors: &mut ValidationErrors) -> Option<String> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            errors.add(self.field, self.required);
            return None;
        };

        let len = value.chars().count();
        let before = errors.get(self.field).map_or(0, <[String]>::len);
        if len < self.min {
            errors.add(self.field, self.min_msg);
        }
        if len > self.max {
            errors.add(self.field, self.max_msg);
        }
        if let Some((pattern, msg)) = self.pattern {
            if !pattern.is_match(value) {
                errors.add(self.field, msg);
            }
        }

        let after = errors.get(self.field).map_or(0, <[String]>::len);
        (before == after).then(|| value.to_string())
    }
}

// --- Jobs ---

static JOB_TITLE: TextRule = TextRule {
    field: "title",
    required: "Job title is required and cannot be empty.",
    min: 5,
    min_msg: "Job title must be at least 5 characters long.",
    max: 255,
    max_msg: "Job title cannot exceed 255 characters.",
    pattern: Some((
        &TITLE_CHARS,
        "Job title contains invalid characters. Only letters, numbers, spaces, hyphens, dots, slashes, and parentheses are allowed.",
    )),
};

static JOB_DESCRIPTION: TextRule = TextRule {
    field: "description",
    required: "Job description is required and cannot be empty.",
    min: 50,
    min_msg: "Job description must be at least 50 characters long to provide adequate detail.",
    max: 5000,
    max_msg: "Job description cannot exceed 5000 characters.",
    pattern: None,
};

static JOB_COMPANY: TextRule = TextRule {
    field: "company",
    required: "Company name is required and cannot be empty.",
    min: 2,
    min_msg: "Company name must be at least 2 characters long.",
    max: 255,
    max_msg: "Company name cannot exceed 255 characters.",
    pattern: Some((
        &COMPANY_CHARS,
        "Company name contains invalid characters. Only letters, numbers, spaces, hyphens, dots, and ampersands are allowed.",
    )),
};

static JOB_LOCATION: TextRule = TextRule {
    field: "location",
    required: "Job location is required and cannot be empty.",
    min: 2,
    min_msg: "Location must be at least 2 characters long.",
    max: 255,
    max_msg: "Location cannot exceed 255 characters.",
    pattern: None,
};

/// JobPayload
///
/// Raw body of `POST /jobs`, `POST /jobs/validate` and `PUT /jobs/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct JobPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub category_id: Option<i64>,
    pub requirements: Option<Vec<String>>,
    pub is_remote: Option<bool>,
    /// `YYYY-MM-DD` or RFC 3339.
    pub application_deadline: Option<String>,
}

/// Outcome of the lookups a job validation depends on.
#[derive(Debug, Clone, Copy)]
pub struct JobContext {
    pub today: NaiveDate,
    /// Whether the payload's `category_id` (if any) names an existing category.
    pub category_exists: bool,
}

fn check_salary(raw: &str, errors: &mut ValidationErrors) -> Option<String> {
    let salary = raw.trim();
    if salary.is_empty() {
        return None;
    }
    let mut ok = true;
    if salary.chars().count() > 100 {
        errors.add("salary", "Salary field cannot exceed 100 characters.");
        ok = false;
    }
    if !salary::is_valid_salary(salary) {
        errors.add(
            "salary",
            "Salary format is invalid. Please use formats like \"$50,000\", \"$40,000 - $60,000\", \"$25/hour\", etc.",
        );
        ok = false;
    }
    ok.then(|| salary.to_string())
}

fn check_job_type(raw: Option<&str>, errors: &mut ValidationErrors) -> Option<JobType> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => {
            errors.add(
                "job_type",
                "Job type is required. Please select one of: full-time, part-time, contract, freelance, or internship.",
            );
            None
        }
        Some(value) => match value.parse::<JobType>() {
            Ok(job_type) => Some(job_type),
            Err(_) => {
                errors.add(
                    "job_type",
                    "Invalid job type selected. Choose from: full-time, part-time, contract, freelance, or internship.",
                );
                None
            }
        },
    }
}

fn check_category(id: i64, ctx: &JobContext, errors: &mut ValidationErrors) -> Option<i64> {
    if ctx.category_exists {
        Some(id)
    } else {
        errors.add(
            "category_id",
            "Selected job category does not exist. Please choose a valid category.",
        );
        None
    }
}

/// Trims entries, drops blanks, then checks the list and entry bounds.
fn check_requirements(raw: &[String], errors: &mut ValidationErrors) -> Option<Vec<String>> {
    let cleaned: Vec<String> = raw
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    let mut ok = true;
    if cleaned.is_empty() {
        errors.add("requirements", "At least one requirement must be specified.");
        ok = false;
    }
    if cleaned.len() > 20 {
        errors.add("requirements", "Cannot specify more than 20 requirements.");
        ok = false;
    }
    for (i, req) in cleaned.iter().enumerate() {
        let field = format!("requirements.{i}");
        let len = req.chars().count();
        if len < 2 {
            errors.add(&field, "Each requirement must be at least 2 characters long.");
            ok = false;
        }
        if len > 255 {
            errors.add(&field, "Each requirement cannot exceed 255 characters.");
            ok = false;
        }
    }
    ok.then_some(cleaned)
}

/// Accepts a bare date (interpreted as UTC midnight) or an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn check_deadline(
    raw: &str,
    ctx: &JobContext,
    errors: &mut ValidationErrors,
) -> Option<DateTime<Utc>> {
    let Some(deadline) = parse_date(raw) else {
        errors.add(
            "application_deadline",
            "Application deadline must be a valid date.",
        );
        return None;
    };

    let day = deadline.date_naive();
    let limit = ctx
        .today
        .checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX);

    let mut ok = true;
    if day <= ctx.today {
        errors.add(
            "application_deadline",
            "Application deadline must be in the future.",
        );
        ok = false;
    }
    if day >= limit {
        errors.add(
            "application_deadline",
            "Application deadline cannot be more than one year from today.",
        );
        ok = false;
    }
    ok.then_some(deadline)
}

/// validate_new_job
///
/// Full validation for job creation: required fields must be present and every supplied
/// field must satisfy its rule.
pub fn validate_new_job(payload: &JobPayload, ctx: &JobContext) -> Result<NewJob, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = JOB_TITLE.check(payload.title.as_deref(), &mut errors);
    let description = JOB_DESCRIPTION.check(payload.description.as_deref(), &mut errors);
    let company = JOB_COMPANY.check(payload.company.as_deref(), &mut errors);
    let location = JOB_LOCATION.check(payload.location.as_deref(), &mut errors);
    let salary = payload
        .salary
        .as_deref()
        .and_then(|s| check_salary(s, &mut errors));
    let job_type = check_job_type(payload.job_type.as_deref(), &mut errors);
    let category_id = payload
        .category_id
        .and_then(|id| check_category(id, ctx, &mut errors));
    let requirements = payload
        .requirements
        .as_deref()
        .map(|r| check_requirements(r, &mut errors))
        .unwrap_or_else(|| Some(Vec::new()));
    let application_deadline = payload
        .application_deadline
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| check_deadline(d, ctx, &mut errors));

    match (title, description, company, location, job_type, requirements) {
        (
            Some(title),
            Some(description),
            Some(company),
            Some(location),
            Some(job_type),
            Some(requirements),
        ) if errors.is_empty() => Ok(NewJob {
            title,
            description,
            company,
            location,
            salary,
            job_type,
            category_id,
            requirements,
            is_remote: payload.is_remote.unwrap_or(false),
            application_deadline,
        }),
        _ => Err(errors),
    }
}

/// validate_job_changes
///
/// Partial validation for updates: absent fields are skipped, present ones use the
/// creation rules.
pub fn validate_job_changes(
    payload: &JobPayload,
    ctx: &JobContext,
) -> Result<JobChanges, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let changes = JobChanges {
        title: payload
            .title
            .as_deref()
            .and_then(|v| JOB_TITLE.check(Some(v), &mut errors)),
        description: payload
            .description
            .as_deref()
            .and_then(|v| JOB_DESCRIPTION.check(Some(v), &mut errors)),
        company: payload
            .company
            .as_deref()
            .and_then(|v| JOB_COMPANY.check(Some(v), &mut errors)),
        location: payload
            .location
            .as_deref()
            .and_then(|v| JOB_LOCATION.check(Some(v), &mut errors)),
        salary: payload
            .salary
            .as_deref()
            .and_then(|s| check_salary(s, &mut errors)),
        job_type: payload
            .job_type
            .as_deref()
            .and_then(|v| check_job_type(Some(v), &mut errors)),
        category_id: payload
            .category_id
            .and_then(|id| check_category(id, ctx, &mut errors)),
        requirements: payload
            .requirements
            .as_deref()
            .and_then(|r| check_requirements(r, &mut errors)),
        is_remote: payload.is_remote,
        application_deadline: payload
            .application_deadline
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| check_deadline(d, ctx, &mut errors)),
    };

    errors.finish(changes)
}

// --- Applications ---

/// ApplicationPayload
///
/// Body of `POST /applications`; the multipart apply route fills the same struct from form
/// parts.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ApplicationPayload {
    pub job_id: Option<String>,
    pub applicant_name: Option<String>,
    pub applicant_email: Option<String>,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
}

impl ApplicationPayload {
    pub fn job_uuid(&self) -> Option<Uuid> {
        self.job_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id.trim()).ok())
    }
}

/// Cleaned application fields. Applicant email is lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationInput {
    pub job_id: Uuid,
    pub applicant_name: String,
    pub applicant_email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
}

/// Where the resume of an application comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeSource {
    /// JSON submissions must carry `resume_url`.
    Url,
    /// Multipart submissions carry the file itself.
    Upload,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn validate_application(
    payload: &ApplicationPayload,
    job_exists: bool,
    source: ResumeSource,
) -> Result<ApplicationInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let job_id = match (non_blank(payload.job_id.as_deref()), payload.job_uuid()) {
        (None, _) => {
            errors.add("job_id", "The job id field is required.");
            None
        }
        (Some(_), Some(id)) if job_exists => Some(id),
        _ => {
            errors.add("job_id", "The selected job id is invalid.");
            None
        }
    };

    let applicant_name = match non_blank(payload.applicant_name.as_deref()) {
        None => {
            errors.add("applicant_name", "The applicant name field is required.");
            None
        }
        Some(name) if name.chars().count() > 255 => {
            errors.add(
                "applicant_name",
                "The applicant name field must not be greater than 255 characters.",
            );
            None
        }
        Some(name) => Some(name.to_string()),
    };

    let applicant_email = match non_blank(payload.applicant_email.as_deref()) {
        None => {
            errors.add("applicant_email", "The applicant email field is required.");
            None
        }
        Some(email) => {
            let mut ok = true;
            if !EMAIL.is_match(email) {
                errors.add(
                    "applicant_email",
                    "The applicant email field must be a valid email address.",
                );
                ok = false;
            }
            if email.chars().count() > 255 {
                errors.add(
                    "applicant_email",
                    "The applicant email field must not be greater than 255 characters.",
                );
                ok = false;
            }
            ok.then(|| email.to_lowercase())
        }
    };

    let phone = non_blank(payload.phone.as_deref()).and_then(|phone| {
        let mut ok = true;
        if phone.chars().count() > 20 {
            errors.add("phone", "The phone field must not be greater than 20 characters.");
            ok = false;
        }
        if !PHONE.is_match(phone) {
            errors.add("phone", "The phone field format is invalid.");
            ok = false;
        }
        ok.then(|| phone.to_string())
    });

    let resume_url = match (non_blank(payload.resume_url.as_deref()), source) {
        (None, ResumeSource::Url) => {
            errors.add("resume_url", "The resume url field is required.");
            None
        }
        (None, ResumeSource::Upload) => None,
        (Some(url), _) if HTTP_URL.is_match(url) => Some(url.to_string()),
        (Some(_), _) => {
            errors.add("resume_url", "The resume url field must be a valid URL.");
            None
        }
    };

    let cover_letter = non_blank(payload.cover_letter.as_deref()).and_then(|text| {
        if text.chars().count() > 2000 {
            errors.add(
                "cover_letter",
                "The cover letter field must not be greater than 2000 characters.",
            );
            None
        } else {
            Some(text.to_string())
        }
    });

    match (job_id, applicant_name, applicant_email) {
        (Some(job_id), Some(applicant_name), Some(applicant_email)) if errors.is_empty() => {
            Ok(ApplicationInput {
                job_id,
                applicant_name,
                applicant_email,
                phone,
                resume_url,
                cover_letter,
            })
        }
        _ => Err(errors),
    }
}

/// StatusPayload
///
/// Body of `PUT /applications/{id}/status`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct StatusPayload {
    pub status: Option<String>,
    pub admin_notes: Option<String>,
}

pub fn validate_status(
    payload: &StatusPayload,
) -> Result<(ApplicationStatus, Option<String>), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let status = match non_blank(payload.status.as_deref()) {
        None => {
            errors.add("status", "The status field is required.");
            None
        }
        Some(raw) => raw.parse::<ApplicationStatus>().ok().or_else(|| {
            errors.add("status", "The selected status is invalid.");
            None
        }),
    };

    let notes = non_blank(payload.admin_notes.as_deref()).and_then(|notes| {
        if notes.chars().count() > 1000 {
            errors.add(
                "admin_notes",
                "The admin notes field must not be greater than 1000 characters.",
            );
            None
        } else {
            Some(notes.to_string())
        }
    });

    match status {
        Some(status) if errors.is_empty() => Ok((status, notes)),
        _ => Err(errors),
    }
}

// --- Categories ---

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct CategoryPayload {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn check_category_name(
    name: &str,
    name_taken: bool,
    errors: &mut ValidationErrors,
) -> Option<String> {
    if name.chars().count() > 255 {
        errors.add("name", "The name field must not be greater than 255 characters.");
        return None;
    }
    if name_taken {
        errors.add("name", "The name has already been taken.");
        return None;
    }
    Some(name.to_string())
}

fn check_category_description(
    description: Option<&str>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    non_blank(description).and_then(|d| {
        if d.chars().count() > 1000 {
            errors.add(
                "description",
                "The description field must not be greater than 1000 characters.",
            );
            None
        } else {
            Some(d.to_string())
        }
    })
}

/// `name_taken` is the result of the uniqueness lookup for the trimmed name.
pub fn validate_new_category(
    payload: &CategoryPayload,
    name_taken: bool,
) -> Result<NewCategory, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = match non_blank(payload.name.as_deref()) {
        None => {
            errors.add("name", "The name field is required.");
            None
        }
        Some(name) => check_category_name(name, name_taken, &mut errors),
    };
    let description = check_category_description(payload.description.as_deref(), &mut errors);

    match name {
        Some(name) if errors.is_empty() => Ok(NewCategory { name, description }),
        _ => Err(errors),
    }
}

pub fn validate_category_changes(
    payload: &CategoryPayload,
    name_taken: bool,
) -> Result<CategoryChanges, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = match payload.name.as_deref() {
        None => None,
        Some(raw) => match non_blank(Some(raw)) {
            None => {
                errors.add("name", "The name field is required.");
                None
            }
            Some(name) => check_category_name(name, name_taken, &mut errors),
        },
    };
    let description = check_category_description(payload.description.as_deref(), &mut errors);

    errors.finish(CategoryChanges { name, description })
}

// --- Accounts ---

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RegisterPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// `company`, `freelancer` or `client`; defaults to `client`.
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

fn check_email(raw: Option<&str>, errors: &mut ValidationErrors) -> Option<String> {
    match non_blank(raw) {
        None => {
            errors.add("email", "The email field is required.");
            None
        }
        Some(email) if !EMAIL.is_match(email) || email.chars().count() > 255 => {
            errors.add("email", "The email field must be a valid email address.");
            None
        }
        Some(email) => Some(email.to_lowercase()),
    }
}

pub fn validate_registration(payload: &RegisterPayload) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = match non_blank(payload.name.as_deref()) {
        None => {
            errors.add("name", "The name field is required.");
            None
        }
        Some(name) => match name.chars().count() {
            0..2 => {
                errors.add("name", "The name field must be at least 2 characters.");
                None
            }
            256.. => {
                errors.add("name", "The name field must not be greater than 255 characters.");
                None
            }
            _ => Some(name.to_string()),
        },
    };

    let email = check_email(payload.email.as_deref(), &mut errors);

    let password = match payload.password.as_deref() {
        None | Some("") => {
            errors.add("password", "The password field is required.");
            None
        }
        Some(p) if p.chars().count() < 8 => {
            errors.add("password", "The password field must be at least 8 characters.");
            None
        }
        Some(p) => Some(p.to_string()),
    };

    let role = match non_blank(payload.role.as_deref()) {
        None => Some(Role::Client),
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) if role.self_assignable() => Some(role),
            _ => {
                errors.add("role", "The selected role is invalid.");
                None
            }
        },
    };

    match (name, email, password, role) {
        (Some(name), Some(email), Some(password), Some(role)) if errors.is_empty() => {
            Ok(Registration {
                name,
                email,
                password,
                role,
            })
        }
        _ => Err(errors),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Returns the lower-cased email and the password.
pub fn validate_login(payload: &LoginPayload) -> Result<(String, String), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let email = check_email(payload.email.as_deref(), &mut errors);
    let password = match payload.password.as_deref() {
        None | Some("") => {
            errors.add("password", "The password field is required.");
            None
        }
        Some(p) => Some(p.to_string()),
    };
    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => Ok((email, password)),
        _ => Err(errors),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RolePayload {
    pub role: Option<String>,
}

/// Admin role assignment; unlike registration every role is allowed.
pub fn validate_role(payload: &RolePayload) -> Result<Role, ValidationErrors> {
    match non_blank(payload.role.as_deref()) {
        None => Err(ValidationErrors::single("role", "The role field is required.")),
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| ValidationErrors::single("role", "The selected role is invalid.")),
    }
}
