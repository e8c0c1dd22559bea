//! Infrastructure layer for database access, HTTP fetching, parsing, and
//! external integrations.
//!
//! This module provides the store, the rate-limited HTTP client, the HTML
//! parsers, the language-model extractor, and configuration/logging setup.

pub mod config;
pub mod database_connection;
pub mod html_parser;
pub mod http_client;
pub mod item_store;
pub mod llm_extractor;
pub mod logging;

// Re-export commonly used items
pub use config::{AppConfig, BatchSettings, DiscoveryConfig, HttpConfig, LlmConfig};
pub use database_connection::DatabaseConnection;
pub use html_parser::{PageParser, SelectorConfig};
pub use http_client::{Fetch, FetchError, HttpClient};
pub use item_store::{ItemStore, StoredListing};
pub use llm_extractor::{ExtractError, ExtractFields, LlmFieldExtractor};
pub use logging::init_logging;
