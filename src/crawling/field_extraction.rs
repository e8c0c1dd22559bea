//! Field-extraction stage: claimed descriptions in, structured fields out.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::crawling::batch_runner::{BatchProcessor, TaskOutcome};
use crate::domain::{CrawlStatus, FailureKind, JobDescription, JobFields};
use crate::infrastructure::item_store::ItemStore;
use crate::infrastructure::llm_extractor::ExtractFields;

/// Hands each claimed description to the language-model extractor and
/// persists the structured fields. Extraction failures are recorded with the
/// truncated free-text label so they stay distinguishable from fetch-stage
/// failures on the listing table.
pub struct FieldExtractionStage {
    store: ItemStore,
    extractor: Arc<dyn ExtractFields>,
}

impl FieldExtractionStage {
    pub fn new(store: ItemStore, extractor: Arc<dyn ExtractFields>) -> Self {
        Self { store, extractor }
    }
}

#[async_trait]
impl BatchProcessor for FieldExtractionStage {
    type Work = JobDescription;
    type Payload = JobFields;

    fn key(work: &JobDescription) -> String {
        work.url.clone()
    }

    async fn claim(&self, limit: usize) -> Result<Vec<JobDescription>> {
        self.store.claim_description_batch(limit).await
    }

    async fn run(&self, description: JobDescription) -> TaskOutcome<JobFields> {
        if description.body.trim().is_empty() {
            return TaskOutcome::Empty;
        }
        match self.extractor.extract(&description.body).await {
            Ok(fields) => TaskOutcome::Extracted(fields),
            Err(error) => TaskOutcome::Failed(FailureKind::other(error.to_string())),
        }
    }

    async fn write_outcome(&self, key: &str, outcome: TaskOutcome<JobFields>) -> Result<()> {
        match outcome {
            TaskOutcome::Extracted(fields) => self.store.record_fields(key, &fields).await,
            TaskOutcome::Empty => {
                self.store
                    .set_description_status(key, &CrawlStatus::Failed(FailureKind::EmptyContent))
                    .await
            }
            TaskOutcome::Failed(kind) => {
                self.store
                    .set_description_status(key, &CrawlStatus::Failed(kind))
                    .await
            }
        }
    }
}
