//! Crawling engine: the batch claim-and-drain core and its two stages.
//!
//! The runner owns the loop mechanics (claiming, the in-flight barrier,
//! reconciling outcomes); the stage processors own what "process one item"
//! means for detail-page crawling and for field extraction.

pub mod batch_runner;
pub mod description_crawler;
pub mod field_extraction;

pub use batch_runner::{BatchProcessor, BatchRunner, BatchSummary, TaskOutcome};
pub use description_crawler::DescriptionCrawler;
pub use field_extraction::FieldExtractionStage;
