//! Repository for status-tracked work items.
//!
//! All claim and outcome writes for both crawl stages go through this store.
//! Claiming is a single atomic `UPDATE ... RETURNING` statement, so a row
//! flips to `IN_PROGRESS` in the same statement that hands it out and can
//! never be observed as claimable by a second caller. Outcome writes are
//! plain updates/upserts keyed by URL and therefore idempotent: replaying
//! the same outcome leaves the store unchanged.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::domain::item::SCRAPED_AT_FORMAT;
use crate::domain::{CrawlStatus, JobDescription, JobFields, JobListing};

/// Repository over the three pipeline tables.
#[derive(Clone)]
pub struct ItemStore {
    pool: SqlitePool,
}

/// A listing row as stored, including its current status label.
#[derive(Debug, Clone, Serialize)]
pub struct StoredListing {
    pub title: String,
    pub company: Option<String>,
    pub url: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub page: Option<i64>,
    pub scraped_at: Option<String>,
    pub crawl_status: String,
}

impl ItemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ===============================
    // LISTING STAGE
    // ===============================

    /// Insert a discovered listing as `NEW`. Duplicate URLs are a no-op;
    /// returns whether a row was actually inserted.
    pub async fn insert_listing(&self, listing: &JobListing) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO job_listings
            (title, company, url, location, salary, page, scraped_at, crawl_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&listing.title)
        .bind(&listing.company)
        .bind(&listing.url)
        .bind(&listing.location)
        .bind(&listing.salary)
        .bind(listing.page as i64)
        .bind(listing.scraped_at.format(SCRAPED_AT_FORMAT).to_string())
        .bind(CrawlStatus::New.as_label())
        .execute(&self.pool)
        .await
        .with_context(|| format!("inserting listing {}", listing.url))?;
        Ok(result.rows_affected() == 1)
    }

    /// Atomically claim up to `limit` NEW listings, flipping them to
    /// `IN_PROGRESS`, oldest first. Returns the claimed URLs.
    pub async fn claim_listing_batch(&self, limit: usize) -> Result<Vec<String>> {
        let urls = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE job_listings SET crawl_status = ?
            WHERE url IN (
                SELECT url FROM job_listings WHERE crawl_status = ? ORDER BY id LIMIT ?
            )
            RETURNING url
            "#,
        )
        .bind(CrawlStatus::InProgress.as_label())
        .bind(CrawlStatus::New.as_label())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("claiming listing batch")?;
        Ok(urls)
    }

    /// Write a listing's status label. Idempotent.
    pub async fn set_listing_status(&self, url: &str, status: &CrawlStatus) -> Result<()> {
        sqlx::query("UPDATE job_listings SET crawl_status = ? WHERE url = ?")
            .bind(status.as_label())
            .bind(url)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating status for {url}"))?;
        Ok(())
    }

    /// Persist a fetched description and mark its listing `DONE` in one
    /// transaction. The description lands as `NEW` for the extraction stage.
    /// Re-running with the same payload converges to the same state.
    pub async fn record_description(&self, url: &str, body: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.context("starting transaction")?;
        sqlx::query(
            "INSERT OR REPLACE INTO job_descriptions (url, body, status) VALUES (?, ?, ?)",
        )
        .bind(url)
        .bind(body)
        .bind(CrawlStatus::New.as_label())
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE job_listings SET crawl_status = ? WHERE url = ?")
            .bind(CrawlStatus::Done.as_label())
            .bind(url)
            .execute(&mut *tx)
            .await?;
        tx.commit()
            .await
            .with_context(|| format!("recording description for {url}"))?;
        Ok(())
    }

    // ===============================
    // EXTRACTION STAGE
    // ===============================

    /// Atomically claim up to `limit` NEW descriptions for field extraction.
    pub async fn claim_description_batch(&self, limit: usize) -> Result<Vec<JobDescription>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            UPDATE job_descriptions SET status = ?
            WHERE url IN (
                SELECT url FROM job_descriptions WHERE status = ? ORDER BY id LIMIT ?
            )
            RETURNING url, body
            "#,
        )
        .bind(CrawlStatus::InProgress.as_label())
        .bind(CrawlStatus::New.as_label())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("claiming description batch")?;
        Ok(rows
            .into_iter()
            .map(|(url, body)| JobDescription { url, body })
            .collect())
    }

    /// Write a description's status label. Idempotent.
    pub async fn set_description_status(&self, url: &str, status: &CrawlStatus) -> Result<()> {
        sqlx::query("UPDATE job_descriptions SET status = ? WHERE url = ?")
            .bind(status.as_label())
            .bind(url)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating description status for {url}"))?;
        Ok(())
    }

    /// Persist extracted fields and mark the description `DONE` in one
    /// transaction. Upsert by URL, so retries never duplicate rows.
    pub async fn record_fields(&self, url: &str, fields: &JobFields) -> Result<()> {
        let mut tx = self.pool.begin().await.context("starting transaction")?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO job_fields
            (url, responsibilities, requirements, company_name, company_address,
             application_email, benefits, compensation, extracted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(url)
        .bind(&fields.responsibilities)
        .bind(&fields.requirements)
        .bind(&fields.company_name)
        .bind(&fields.company_address)
        .bind(&fields.application_email)
        .bind(&fields.benefits)
        .bind(&fields.compensation)
        .bind(Utc::now().format(SCRAPED_AT_FORMAT).to_string())
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE job_descriptions SET status = ? WHERE url = ?")
            .bind(CrawlStatus::Done.as_label())
            .bind(url)
            .execute(&mut *tx)
            .await?;
        tx.commit()
            .await
            .with_context(|| format!("recording fields for {url}"))?;
        Ok(())
    }

    // ===============================
    // COUNTS, RESET, EXPORT
    // ===============================

    pub async fn count_listings_with_status(&self, status: &CrawlStatus) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_listings WHERE crawl_status = ?")
                .bind(status.as_label())
                .fetch_one(&self.pool)
                .await
                .context("counting listings")?;
        Ok(count as u64)
    }

    pub async fn count_descriptions_with_status(&self, status: &CrawlStatus) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_descriptions WHERE status = ?")
                .bind(status.as_label())
                .fetch_one(&self.pool)
                .await
                .context("counting descriptions")?;
        Ok(count as u64)
    }

    /// Per-label row counts for the listing table.
    pub async fn listing_status_counts(&self) -> Result<Vec<(String, u64)>> {
        self.status_counts("job_listings", "crawl_status").await
    }

    /// Per-label row counts for the description table.
    pub async fn description_status_counts(&self) -> Result<Vec<(String, u64)>> {
        self.status_counts("job_descriptions", "status").await
    }

    async fn status_counts(&self, table: &str, column: &str) -> Result<Vec<(String, u64)>> {
        let rows = sqlx::query(&format!(
            "SELECT {column} AS label, COUNT(*) AS n FROM {table} GROUP BY {column} ORDER BY {column}"
        ))
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("counting {table} by status"))?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("label"), row.get::<i64, _>("n") as u64))
            .collect())
    }

    /// Rewrite stranded `IN_PROGRESS` listings (and, optionally, every
    /// failure label) back to `NEW`. Returns the number of rows touched.
    /// This is the out-of-band crash-recovery operation; the batch loop
    /// itself never re-claims `IN_PROGRESS` rows.
    pub async fn reset_listings(&self, include_failures: bool) -> Result<u64> {
        self.reset("job_listings", "crawl_status", include_failures).await
    }

    /// Same as [`Self::reset_listings`] for the description table.
    pub async fn reset_descriptions(&self, include_failures: bool) -> Result<u64> {
        self.reset("job_descriptions", "status", include_failures).await
    }

    async fn reset(&self, table: &str, column: &str, include_failures: bool) -> Result<u64> {
        let sql = if include_failures {
            // Everything that is neither waiting nor finished: stranded
            // claims plus the whole open-ended family of failure labels.
            format!("UPDATE {table} SET {column} = ? WHERE {column} NOT IN (?, ?)")
        } else {
            format!("UPDATE {table} SET {column} = ? WHERE {column} = ?")
        };
        let mut query = sqlx::query(&sql).bind(CrawlStatus::New.as_label());
        query = if include_failures {
            query
                .bind(CrawlStatus::New.as_label())
                .bind(CrawlStatus::Done.as_label())
        } else {
            query.bind(CrawlStatus::InProgress.as_label())
        };
        let result = query
            .execute(&self.pool)
            .await
            .with_context(|| format!("resetting {table}"))?;
        Ok(result.rows_affected())
    }

    /// All listing rows, oldest first, for feed export.
    pub async fn all_listings(&self) -> Result<Vec<StoredListing>> {
        let rows = sqlx::query(
            r#"
            SELECT title, company, url, location, salary, page, scraped_at, crawl_status
            FROM job_listings ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("loading listings")?;
        Ok(rows
            .into_iter()
            .map(|row| StoredListing {
                title: row.get("title"),
                company: row.get("company"),
                url: row.get("url"),
                location: row.get("location"),
                salary: row.get("salary"),
                page: row.get("page"),
                scraped_at: row.get("scraped_at"),
                crawl_status: row.get("crawl_status"),
            })
            .collect())
    }

    /// Current status label of one listing, if present.
    pub async fn listing_status(&self, url: &str) -> Result<Option<CrawlStatus>> {
        let label: Option<String> =
            sqlx::query_scalar("SELECT crawl_status FROM job_listings WHERE url = ?")
                .bind(url)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("reading status for {url}"))?;
        Ok(label.map(|l| CrawlStatus::from_label(&l)))
    }

    /// Stored description body for one URL, if present.
    pub async fn description_body(&self, url: &str) -> Result<Option<String>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM job_descriptions WHERE url = ?")
                .bind(url)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("reading description for {url}"))?;
        Ok(body)
    }
}
