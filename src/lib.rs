//! jobharvest - batch job-board crawling and structured-data-extraction
//! pipeline.
//!
//! Discovers listing pages, extracts item links, fetches per-item detail
//! pages in checkpointed batches with a status-tracked lifecycle
//! (`NEW -> IN_PROGRESS -> DONE | <failure label>`), and optionally hands
//! descriptions to a language model for structured-field extraction. Work
//! survives process restarts: a run picks up whatever is still `NEW`, and
//! an operational reset recovers rows stranded by a crash.

// Module declarations
pub mod application;
pub mod crawling;
pub mod domain;
pub mod infrastructure;
