use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    models::{Job, Pagination},
    salary::annualized_range,
};

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

/// JobFilter
///
/// Query parameters accepted by `GET /jobs`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobFilter {
    /// Free text matched against title, description, company and location.
    pub q: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub job_type: Option<String>,
    pub category_id: Option<i64>,
    /// Substring of the salary text, e.g. `hour`.
    pub salary: Option<String>,
    /// Annualized lower bound.
    pub min_salary: Option<u64>,
    /// Annualized upper bound.
    pub max_salary: Option<u64>,
    pub remote: Option<bool>,
    pub posted_within_days: Option<i64>,
    /// `newest` (default), `oldest`, `title`, `company`, `salary` or `relevance`.
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Newest,
    Oldest,
    Title,
    Company,
    Salary,
    Relevance,
}

impl SortOrder {
    /// Unknown values fall back to `Newest`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => SortOrder::Oldest,
            Some("title") => SortOrder::Title,
            Some("company") => SortOrder::Company,
            Some("salary") => SortOrder::Salary,
            Some("relevance") => SortOrder::Relevance,
            _ => SortOrder::Newest,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl JobFilter {
    pub fn text(&self) -> Option<&str> {
        non_blank(&self.q)
    }

    pub fn location(&self) -> Option<&str> {
        non_blank(&self.location)
    }

    pub fn company(&self) -> Option<&str> {
        non_blank(&self.company)
    }

    pub fn job_type(&self) -> Option<&str> {
        non_blank(&self.job_type)
    }

    pub fn salary_pattern(&self) -> Option<&str> {
        non_blank(&self.salary)
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::parse(self.sort.as_deref())
    }

    /// Lower bound on `posted_date` implied by `posted_within_days`. A window reaching past
    /// the representable date range imposes no bound.
    pub fn posted_since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.posted_within_days
            .filter(|d| *d > 0)
            .and_then(Duration::try_days)
            .and_then(|window| now.checked_sub_signed(window))
    }

    /// Store-side predicate: everything except the annualized salary range.
    pub fn matches(&self, job: &Job, now: DateTime<Utc>) -> bool {
        if let Some(q) = self.text() {
            let hit = [&job.title, &job.description, &job.company, &job.location]
                .iter()
                .any(|field| contains_ci(field, q));
            if !hit {
                return false;
            }
        }
        if self.location().is_some_and(|l| !contains_ci(&job.location, l)) {
            return false;
        }
        if self.company().is_some_and(|c| !contains_ci(&job.company, c)) {
            return false;
        }
        if self
            .job_type()
            .is_some_and(|t| !job.job_type.eq_ignore_ascii_case(t))
        {
            return false;
        }
        if self.category_id.is_some() && job.category_id != self.category_id {
            return false;
        }
        if let Some(pattern) = self.salary_pattern() {
            let hit = job.salary.as_deref().is_some_and(|s| contains_ci(s, pattern));
            if !hit {
                return false;
            }
        }
        if self.remote.is_some_and(|remote| job.is_remote != remote) {
            return false;
        }
        if self
            .posted_since(now)
            .is_some_and(|since| job.posted_date < since)
        {
            return false;
        }
        true
    }

    /// Annualized salary check. Jobs without a parseable salary fail once a bound is set.
    pub fn salary_in_range(&self, job: &Job) -> bool {
        if self.min_salary.is_none() && self.max_salary.is_none() {
            return true;
        }
        job.salary
            .as_deref()
            .and_then(annualized_range)
            .is_some_and(|range| range.within(self.min_salary, self.max_salary))
    }
}

/// Constant-weight score: title 10, company 5, location 3, description 2.
pub fn relevance_score(job: &Job, q: Option<&str>) -> u32 {
    let Some(q) = q else { return 0 };
    [
        (&job.title, 10),
        (&job.company, 5),
        (&job.location, 3),
        (&job.description, 2),
    ]
    .into_iter()
    .filter(|(field, _)| contains_ci(field, q))
    .map(|(_, weight)| weight)
    .sum()
}

fn salary_key(job: &Job) -> Option<u64> {
    job.salary
        .as_deref()
        .and_then(annualized_range)
        .map(|range| range.max)
}

pub fn sort_jobs(jobs: &mut [Job], order: SortOrder, q: Option<&str>) {
    let newest = |a: &Job, b: &Job| b.posted_date.cmp(&a.posted_date);
    match order {
        SortOrder::Newest => jobs.sort_by(newest),
        SortOrder::Oldest => jobs.sort_by(|a, b| a.posted_date.cmp(&b.posted_date)),
        SortOrder::Title => jobs.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| newest(a, b))
        }),
        SortOrder::Company => jobs.sort_by(|a, b| {
            a.company
                .to_lowercase()
                .cmp(&b.company.to_lowercase())
                .then_with(|| newest(a, b))
        }),
        // Highest annualized salary first; unparseable salaries last.
        SortOrder::Salary => jobs.sort_by(|a, b| match (salary_key(a), salary_key(b)) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| newest(a, b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => newest(a, b),
        }),
        SortOrder::Relevance => jobs.sort_by(|a, b| {
            relevance_score(b, q)
                .cmp(&relevance_score(a, q))
                .then_with(|| newest(a, b))
        }),
    }
}

/// Resolved page request: `page` ≥ 1, `per_page` in 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn meta(&self, total: u64) -> Pagination {
        let total_pages = total.div_ceil(u64::from(self.per_page)) as u32;
        Pagination {
            current_page: self.page,
            per_page: self.per_page,
            total,
            total_pages,
            has_next_page: self.page < total_pages,
            has_prev_page: self.page > 1,
        }
    }

    /// Slices one page out of `items`. Pages past the end are empty.
    pub fn slice<T>(&self, items: Vec<T>) -> (Vec<T>, Pagination) {
        let meta = self.meta(items.len() as u64);
        let skip = (self.page as usize - 1).saturating_mul(self.per_page as usize);
        let page = items
            .into_iter()
            .skip(skip)
            .take(self.per_page as usize)
            .collect();
        (page, meta)
    }
}

/// search
///
/// Applies the salary range, ordering and paging to jobs that already passed the
/// store-side filter.
pub fn search(jobs: Vec<Job>, filter: &JobFilter) -> (Vec<Job>, Pagination) {
    let mut jobs: Vec<Job> = jobs
        .into_iter()
        .filter(|job| filter.salary_in_range(job))
        .collect();
    sort_jobs(&mut jobs, filter.sort_order(), filter.text());
    PageRequest::new(filter.page, filter.per_page).slice(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, company: &str, salary: Option<&str>, age_days: i64) -> Job {
        Job {
            title: title.into(),
            company: company.into(),
            location: "Remote".into(),
            description: "We build developer tooling for teams of every size.".into(),
            salary: salary.map(Into::into),
            job_type: "full-time".into(),
            posted_date: Utc::now() - Duration::days(age_days),
            ..Job::default()
        }
    }

    #[test]
    fn relevance_weights() {
        let j = job("Rust Developer", "Rustaceans Ltd", None, 0);
        assert_eq!(relevance_score(&j, Some("rust")), 15);
        assert_eq!(relevance_score(&j, Some("remote")), 3);
        assert_eq!(relevance_score(&j, Some("tooling")), 2);
        assert_eq!(relevance_score(&j, None), 0);
    }

    #[test]
    fn store_filter_is_case_insensitive() {
        let j = job("Data Engineer", "Acme", Some("$30 per hour"), 3);
        let now = Utc::now();
        let filter = JobFilter {
            q: Some("ENGINEER".into()),
            company: Some("acme".into()),
            salary: Some("HOUR".into()),
            job_type: Some("Full-Time".into()),
            posted_within_days: Some(7),
            ..JobFilter::default()
        };
        assert!(filter.matches(&j, now));

        let stale = JobFilter {
            posted_within_days: Some(1),
            ..JobFilter::default()
        };
        assert!(!stale.matches(&j, now));

        let remote_only = JobFilter {
            remote: Some(true),
            ..JobFilter::default()
        };
        assert!(!remote_only.matches(&j, now));
    }

    #[test]
    fn huge_posted_window_is_unbounded() {
        let j = job("Data Engineer", "Acme", None, 3);
        let now = Utc::now();
        for days in [1_000_000_000, i64::MAX] {
            let filter = JobFilter {
                posted_within_days: Some(days),
                ..JobFilter::default()
            };
            assert_eq!(filter.posted_since(now), None);
            assert!(filter.matches(&j, now));
        }
    }

    #[test]
    fn salary_bounds_exclude_unparseable() {
        let hourly = job("A", "A", Some("$30 per hour"), 0); // 62,400 / year
        let none = job("B", "B", None, 0);
        let filter = JobFilter {
            min_salary: Some(60_000),
            ..JobFilter::default()
        };
        assert!(filter.salary_in_range(&hourly));
        assert!(!filter.salary_in_range(&none));
        assert!(JobFilter::default().salary_in_range(&none));
    }

    #[test]
    fn sorts() {
        let mut jobs = vec![
            job("Backend", "Zeta", Some("$50,000"), 2),
            job("Analyst", "Alpha", None, 1),
            job("Rust Lead", "Mid", Some("$90,000"), 3),
        ];

        sort_jobs(&mut jobs, SortOrder::Newest, None);
        assert_eq!(jobs[0].title, "Analyst");

        sort_jobs(&mut jobs, SortOrder::Title, None);
        assert_eq!(jobs[0].title, "Analyst");

        sort_jobs(&mut jobs, SortOrder::Salary, None);
        assert_eq!(jobs[0].title, "Rust Lead");
        assert_eq!(jobs[2].title, "Analyst");

        sort_jobs(&mut jobs, SortOrder::Relevance, Some("rust"));
        assert_eq!(jobs[0].title, "Rust Lead");

        assert_eq!(SortOrder::parse(Some("bogus")), SortOrder::Newest);
    }

    #[test]
    fn pagination_meta() {
        let req = PageRequest::new(Some(2), Some(10));
        let (page, meta) = req.slice((0..25).collect::<Vec<_>>());
        assert_eq!(page, (10..20).collect::<Vec<_>>());
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(meta.has_prev_page);

        let (past_end, meta) = PageRequest::new(Some(9), None).slice(vec![1, 2, 3]);
        assert!(past_end.is_empty());
        assert!(!meta.has_next_page);

        assert_eq!(PageRequest::new(Some(0), Some(1000)).per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(Some(0), None).page, 1);
    }
}
