//! Readiness check for external schedulers.
//!
//! Three-way answer: work available, no work, or the check itself failed.
//! The outcomes map to process exit codes 0 / 1 / 2 so a cron wrapper can
//! decide whether to launch another crawl run. The check opens the store
//! read-only-in-spirit: a missing database file is a failed check, never a
//! silently created empty store.

use sqlx::SqlitePool;

use crate::domain::CrawlStatus;

/// Result of probing the store for pending work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// At least one NEW listing is waiting.
    WorkAvailable(u64),
    /// Nothing left to claim.
    NoWork,
    /// The store could not be opened or queried.
    CheckFailed(String),
}

impl Readiness {
    /// Exit code contract: 0 = continue, 1 = stop, 2 = error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::WorkAvailable(_) => 0,
            Self::NoWork => 1,
            Self::CheckFailed(_) => 2,
        }
    }
}

/// Count NEW listings in the store at `database_url`. Never panics and
/// never creates the database file.
pub async fn check_pending_listings(database_url: &str) -> Readiness {
    match count_new_listings(database_url).await {
        Ok(0) => Readiness::NoWork,
        Ok(count) => Readiness::WorkAvailable(count),
        Err(error) => Readiness::CheckFailed(format!("{error:#}")),
    }
}

async fn count_new_listings(database_url: &str) -> anyhow::Result<u64> {
    let pool = SqlitePool::connect(database_url).await?;
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM job_listings WHERE crawl_status = ?")
            .bind(CrawlStatus::New.as_label())
            .fetch_one(&pool)
            .await?;
    pool.close().await;
    Ok(count as u64)
}
