//! Configuration infrastructure.
//!
//! Serde-backed settings with concrete defaults, loadable from an optional
//! TOML file plus `JOBHARVEST_`-prefixed environment overrides
//! (e.g. `JOBHARVEST_BATCH__BATCH_SIZE=25`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub discovery: DiscoveryConfig,
    pub batch: BatchSettings,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

/// Store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite:jobharvest.db`.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:jobharvest.db".to_string(),
        }
    }
}

/// HTTP client settings for polite crawling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Pool of browser user agents, one picked per request.
    pub user_agents: Vec<String>,
    /// Per-request deadline enforced by the client.
    pub timeout_seconds: u64,
    /// Global request pacing across all in-flight tasks.
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0"
                    .to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.4 Safari/605.1.15"
                    .to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                    .to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                    .to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                    .to_string(),
            ],
            timeout_seconds: 15,
            max_requests_per_second: 3,
            follow_redirects: true,
        }
    }
}

/// Listing-page discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Search URL for the first listing page; later pages append `&p=N`.
    pub search_url: String,
    pub first_page: u32,
    pub last_page: u32,
    /// Bound on concurrently fetched listing pages.
    pub max_concurrent_pages: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.careerjet.com.bd/jobs?s=&l=Bangladesh".to_string(),
            first_page: 1,
            last_page: 100,
            max_concurrent_pages: 3,
        }
    }
}

impl DiscoveryConfig {
    /// URL of one listing page. The first page carries no page parameter.
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            self.search_url.clone()
        } else {
            format!("{}&p={page}", self.search_url)
        }
    }
}

/// Batch claim-and-drain settings shared by both crawl stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Rows claimed per batch.
    pub batch_size: usize,
    /// Stop after this many batches; `None` drains until no NEW rows remain.
    pub max_batches: Option<u32>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_batches: None,
        }
    }
}

/// Language-model extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Token-bucket quota for extract calls.
    pub requests_per_minute: u32,
    /// Fixed sleep when the bucket is empty.
    pub backoff_seconds: u64,
    /// Environment variable holding the provider API key.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "command-a-03-2025".to_string(),
            requests_per_minute: 10,
            backoff_seconds: 60,
            api_key_env: "COHERE_API_KEY".to_string(),
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Optional log file; console output stays on either way.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then the optional TOML file, then
    /// `JOBHARVEST_` environment overrides (`__` separates nesting).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&AppConfig::default())
                .context("serializing default configuration")?,
        );
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::with_name("jobharvest").required(false));
        }
        builder
            .add_source(config::Environment::with_prefix("JOBHARVEST").separator("__"))
            .build()
            .context("assembling configuration")?
            .try_deserialize()
            .context("deserializing configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.batch.batch_size, 50);
        assert_eq!(config.batch.max_batches, None);
        assert_eq!(config.llm.requests_per_minute, 10);
        assert!(!config.http.user_agents.is_empty());
    }

    #[test]
    fn first_page_has_no_page_parameter() {
        let discovery = DiscoveryConfig::default();
        assert_eq!(discovery.page_url(1), discovery.search_url);
        assert_eq!(discovery.page_url(2), format!("{}&p=2", discovery.search_url));
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.database.url, "sqlite:jobharvest.db");
    }
}
