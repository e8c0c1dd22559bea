//! Detail-page crawl stage: claimed listing URLs in, description rows out.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::crawling::batch_runner::{BatchProcessor, TaskOutcome};
use crate::domain::{CrawlStatus, FailureKind};
use crate::infrastructure::html_parser::PageParser;
use crate::infrastructure::http_client::Fetch;
use crate::infrastructure::item_store::ItemStore;

/// Fetches each claimed listing's detail page and extracts its description.
///
/// Success writes the description (and flips the listing `DONE`) in one
/// transaction; a reachable page with no usable text records the dedicated
/// empty-content label so triage can tell it apart from a fetch failure.
pub struct DescriptionCrawler {
    store: ItemStore,
    fetcher: Arc<dyn Fetch>,
    parser: Arc<PageParser>,
}

impl DescriptionCrawler {
    pub fn new(store: ItemStore, fetcher: Arc<dyn Fetch>, parser: Arc<PageParser>) -> Self {
        Self {
            store,
            fetcher,
            parser,
        }
    }
}

#[async_trait]
impl BatchProcessor for DescriptionCrawler {
    type Work = String;
    type Payload = String;

    fn key(work: &String) -> String {
        work.clone()
    }

    async fn claim(&self, limit: usize) -> Result<Vec<String>> {
        self.store.claim_listing_batch(limit).await
    }

    async fn run(&self, url: String) -> TaskOutcome<String> {
        match self.fetcher.fetch_text(&url).await {
            Ok(html) => match self.parser.extract_description(&html) {
                Some(body) => TaskOutcome::Extracted(body),
                None => TaskOutcome::Empty,
            },
            Err(error) => TaskOutcome::Failed(error.failure_kind()),
        }
    }

    async fn write_outcome(&self, key: &str, outcome: TaskOutcome<String>) -> Result<()> {
        match outcome {
            TaskOutcome::Extracted(body) => self.store.record_description(key, &body).await,
            TaskOutcome::Empty => {
                self.store
                    .set_listing_status(key, &CrawlStatus::Failed(FailureKind::EmptyContent))
                    .await
            }
            TaskOutcome::Failed(kind) => {
                self.store
                    .set_listing_status(key, &CrawlStatus::Failed(kind))
                    .await
            }
        }
    }
}
