//! Work item entities and the cleaning pipeline.
//!
//! A listing page yields [`RawListing`]s: untrimmed text fragments straight
//! out of the HTML. [`RawListing::clean`] validates and normalizes them into
//! [`JobListing`]s ready for the store. Descriptions and extracted fields are
//! the derived payloads of the two crawl stages.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// `20,000 - 30,000` or `25,000`, commas optional.
static SALARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d,]+)(?:\s*-\s*([\d,]+))?").expect("salary pattern is valid"));

/// Timestamp format used for the `scraped_at` column.
pub const SCRAPED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Unvalidated listing fragments as parsed from a listing page.
#[derive(Debug, Clone, Default)]
pub struct RawListing {
    pub title: Option<String>,
    pub company: Vec<String>,
    pub link: Option<String>,
    pub location: Vec<String>,
    pub salary: Vec<String>,
    pub page: u32,
}

/// Why a raw listing was dropped during cleaning.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CleanError {
    #[error("listing has no title")]
    MissingTitle,
    #[error("listing has no detail link")]
    MissingLink,
    #[error("listing link could not be resolved: {0}")]
    BadLink(String),
}

/// A cleaned, normalized listing keyed by its detail-page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListing {
    pub title: String,
    pub company: Option<String>,
    pub url: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub page: u32,
    pub scraped_at: DateTime<Utc>,
}

impl RawListing {
    /// Validate and normalize into a [`JobListing`].
    ///
    /// Title is mandatory. Company and location fragments are whitespace
    /// joined; salary is reduced to `low-high` or `low` with commas removed;
    /// relative links are resolved against `base_url`.
    pub fn clean(self, base_url: &Url) -> Result<JobListing, CleanError> {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CleanError::MissingTitle)?
            .to_string();

        let link = self.link.as_deref().ok_or(CleanError::MissingLink)?;
        let url = if link.starts_with("http") {
            link.to_string()
        } else {
            base_url
                .join(link)
                .map_err(|e| CleanError::BadLink(format!("{link}: {e}")))?
                .to_string()
        };

        Ok(JobListing {
            title,
            company: join_fragments(&self.company),
            url,
            location: join_fragments(&self.location),
            salary: normalize_salary(&self.salary),
            page: self.page,
            scraped_at: Utc::now(),
        })
    }
}

/// Join text fragments with single spaces, dropping empty pieces.
fn join_fragments(fragments: &[String]) -> Option<String> {
    let joined = fragments
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() { None } else { Some(joined) }
}

/// Reduce raw salary fragments to `low-high` or `low`, commas stripped.
fn normalize_salary(fragments: &[String]) -> Option<String> {
    let raw: String = fragments
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect();
    let captures = SALARY_RE.captures(&raw)?;
    let low = captures.get(1)?.as_str().replace(',', "");
    match captures.get(2) {
        Some(high) => Some(format!("{low}-{}", high.as_str().replace(',', ""))),
        None => Some(low),
    }
}

/// A fetched detail-page description awaiting field extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub url: String,
    pub body: String,
}

/// Structured fields pulled out of a description by the language model.
///
/// The two section fields are required by the extraction contract; the rest
/// are present only when the posting mentions them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFields {
    /// Section detailing key responsibilities.
    pub responsibilities: String,
    /// Section outlining required skills, qualifications, or expertise.
    pub requirements: String,
    /// Name of the company offering the job, if mentioned.
    #[serde(default)]
    pub company_name: Option<String>,
    /// Company address or location, if explicitly stated.
    #[serde(default)]
    pub company_address: Option<String>,
    /// Email address where resumes should be sent, if provided.
    #[serde(default)]
    pub application_email: Option<String>,
    /// Benefits offered for the position, if mentioned.
    #[serde(default)]
    pub benefits: Option<String>,
    /// Salary or compensation information, if provided.
    #[serde(default)]
    pub compensation: Option<String>,
}
