//! HTTP client for web crawling with rate limiting and error handling.
//!
//! Provides a robust HTTP client specifically designed for web scraping
//! with respect for server resources. Failures are classified into the
//! typed [`FetchError`] variants the outcome reconciler records, with
//! precedence: explicit HTTP status, then DNS, then timeout, then generic.

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{Client, header::USER_AGENT};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

use crate::domain::FailureKind;
use crate::infrastructure::config::HttpConfig;

/// Typed fetch failure, terminal for the current attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("http status {0}")]
    Status(u16),
    #[error("dns lookup failed: {0}")]
    Dns(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// The failure label recorded against the work item.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Status(code) => FailureKind::Http(*code),
            Self::Dns(_) => FailureKind::Dns,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Other(detail) => FailureKind::other(detail),
        }
    }
}

/// Narrow fetcher contract consumed by the crawl stages. The implementation
/// enforces its own deadline and surfaces it as [`FetchError::Timeout`];
/// callers never need per-task cancellation.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch a URL and return its body as text, or a classified failure.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Rate-limited HTTP client with a rotating user-agent pool.
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    user_agents: Vec<String>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        anyhow::ensure!(
            !config.user_agents.is_empty(),
            "at least one user agent is required"
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .cookie_store(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            user_agents: config.user_agents.clone(),
        })
    }

    fn pick_user_agent(&self) -> &str {
        &self.user_agents[fastrand::usize(..self.user_agents.len())]
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("fetching {url}");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.pick_user_agent())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("fetch of {url} answered {status}");
            return Err(FetchError::Status(status.as_u16()));
        }

        let text = response.text().await.map_err(classify_reqwest_error)?;
        tracing::debug!("fetched {url} ({} chars)", text.len());
        Ok(text)
    }
}

/// Map a transport-level error onto the closed failure set. Status errors
/// are handled before this by inspecting the response directly.
fn classify_reqwest_error(error: reqwest::Error) -> FetchError {
    if let Some(status) = error.status() {
        return FetchError::Status(status.as_u16());
    }
    if is_dns_failure(&error) {
        return FetchError::Dns(error.to_string());
    }
    if error.is_timeout() {
        return FetchError::Timeout(error.to_string());
    }
    FetchError::Other(error.to_string())
}

/// reqwest does not expose DNS failures as a variant; walk the source chain
/// and look for the resolver's message.
fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(inner) = source {
        let message = inner.to_string().to_ascii_lowercase();
        if message.contains("dns") || message.contains("failed to lookup address") {
            return true;
        }
        source = inner.source();
    }
    false
}
