//! Batch claim-and-drain loop.
//!
//! One driver claims a bounded slice of eligible work, fans each item out as
//! a concurrent task, and drains every in-flight task before claiming again
//! (the batch barrier). The loop is iterative: it stops when a claim returns
//! no rows or when the configured batch ceiling is reached, both checked at
//! batch boundaries. Per-item failures are reconciled like successes and can
//! never stall the loop; only store errors abort the run, surfaced to the
//! caller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::FailureKind;
use crate::infrastructure::config::BatchSettings;

/// Tagged result of processing one claimed work item, consumed uniformly by
/// the reconciler. `Empty` means the fetch succeeded but nothing usable was
/// extracted; it is recorded distinctly from fetch failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<P> {
    Extracted(P),
    Empty,
    Failed(FailureKind),
}

/// One stage of the pipeline: how to claim work, process a single item, and
/// write the reconciled outcome back to the store.
///
/// `claim` must atomically flip returned items out of the eligible set so a
/// later batch can never see them again. `run` must not touch the store; all
/// writes go through `write_outcome` on the driver.
#[async_trait]
pub trait BatchProcessor: Send + Sync + 'static {
    type Work: Send + 'static;
    type Payload: Send + 'static;

    /// Identity of a work item, used for outcome writes and logging.
    fn key(work: &Self::Work) -> String;

    /// Claim up to `limit` eligible items, marking them in progress.
    async fn claim(&self, limit: usize) -> Result<Vec<Self::Work>>;

    /// Process one claimed item. Infallible by construction: every failure
    /// is folded into the returned outcome.
    async fn run(&self, work: Self::Work) -> TaskOutcome<Self::Payload>;

    /// Persist one outcome: derived payload plus terminal status on
    /// success, a failure label otherwise. Must be idempotent.
    async fn write_outcome(&self, key: &str, outcome: TaskOutcome<Self::Payload>) -> Result<()>;
}

/// Counters for one run of the loop.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub batches: u32,
    pub claimed: u64,
    pub succeeded: u64,
    pub empty: u64,
    pub failed: u64,
}

/// Drives a [`BatchProcessor`] until the work is exhausted or the batch
/// ceiling is hit.
pub struct BatchRunner<P: BatchProcessor> {
    processor: Arc<P>,
    settings: BatchSettings,
    run_id: Uuid,
}

impl<P: BatchProcessor> BatchRunner<P> {
    pub fn new(processor: P, settings: BatchSettings) -> Self {
        Self {
            processor: Arc::new(processor),
            settings,
            run_id: Uuid::new_v4(),
        }
    }

    /// Run batches until no work remains or the ceiling is reached.
    pub async fn run(&self) -> Result<BatchSummary> {
        let run_id = self.run_id;
        let mut summary = BatchSummary::default();

        loop {
            if let Some(max) = self.settings.max_batches {
                if summary.batches >= max {
                    info!(%run_id, max_batches = max, "batch ceiling reached, stopping");
                    break;
                }
            }

            let batch = self
                .processor
                .claim(self.settings.batch_size)
                .await
                .context("claiming batch")?;
            if batch.is_empty() {
                info!(%run_id, "no eligible work left, stopping");
                break;
            }

            summary.batches += 1;
            summary.claimed += batch.len() as u64;
            info!(
                %run_id,
                batch = summary.batches,
                size = batch.len(),
                "claimed batch"
            );

            let mut in_flight: JoinSet<(String, TaskOutcome<P::Payload>)> = JoinSet::new();
            for work in batch {
                let key = P::key(&work);
                let processor = Arc::clone(&self.processor);
                in_flight.spawn(async move {
                    let outcome = processor.run(work).await;
                    (key, outcome)
                });
            }

            // Drain to zero before the next claim: the batch barrier.
            while let Some(joined) = in_flight.join_next().await {
                match joined {
                    Ok((key, outcome)) => {
                        match &outcome {
                            TaskOutcome::Extracted(_) => summary.succeeded += 1,
                            TaskOutcome::Empty => {
                                summary.empty += 1;
                                warn!(%run_id, %key, "nothing usable extracted");
                            }
                            TaskOutcome::Failed(kind) => {
                                summary.failed += 1;
                                warn!(%run_id, %key, failure = %kind, "task failed");
                            }
                        }
                        self.processor
                            .write_outcome(&key, outcome)
                            .await
                            .with_context(|| format!("writing outcome for {key}"))?;
                    }
                    Err(join_error) => {
                        // A panicked task still drains; the row stays
                        // IN_PROGRESS for the operational reset to recover.
                        summary.failed += 1;
                        error!(%run_id, %join_error, "task aborted before producing an outcome");
                    }
                }
            }
        }

        info!(
            %run_id,
            batches = summary.batches,
            claimed = summary.claimed,
            succeeded = summary.succeeded,
            empty = summary.empty,
            failed = summary.failed,
            "batch run finished"
        );
        Ok(summary)
    }
}
