//! Language-model field extraction via rig-core.
//!
//! One narrow contract: description text in, [`JobFields`] out. The provider
//! call is paced by a token bucket; an empty bucket is flow control, not an
//! error, so the task sleeps a fixed interval and tries again for as long as
//! it takes. Only the current task waits; other in-flight work is untouched.

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use rig::client::CompletionClient;
use rig::completion::Prompt;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::domain::JobFields;
use crate::infrastructure::config::LlmConfig;

const EXTRACTION_PREAMBLE: &str = "You are an expert job description analyzer. \
Given a raw job description, extract the following fields: responsibilities, \
requirements, company_name, company_address, application_email, benefits, \
compensation. Respond with a single JSON object using exactly those keys. \
The responsibilities and requirements values are required strings; every \
other value is a string or null. Do not add commentary or markdown fences.";

/// Field-extraction failure for one description.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction call failed: {0}")]
    Provider(String),
    #[error("model reply was not valid field JSON: {0}")]
    Parse(String),
}

/// Narrow extraction contract consumed by the extraction stage.
#[async_trait]
pub trait ExtractFields: Send + Sync {
    /// Extract structured fields from one description.
    async fn extract(&self, description: &str) -> Result<JobFields, ExtractError>;
}

/// Cohere-backed extractor with token-bucket pacing.
pub struct LlmFieldExtractor {
    agent: rig::agent::Agent<rig::providers::cohere::CompletionModel>,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    backoff: Duration,
}

impl LlmFieldExtractor {
    /// Build from configuration, reading the API key from the configured
    /// environment variable.
    pub fn from_env(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("missing {} in environment or .env file", config.api_key_env))?;
        let client = rig::providers::cohere::Client::new(&api_key)
            .context("failed to create Cohere client")?;
        let agent = client
            .agent(&config.model)
            .preamble(EXTRACTION_PREAMBLE)
            .build();
        let quota = Quota::per_minute(
            NonZeroU32::new(config.requests_per_minute)
                .context("requests_per_minute must be greater than 0")?,
        );
        Ok(Self {
            agent,
            limiter: RateLimiter::direct(quota),
            backoff: Duration::from_secs(config.backoff_seconds),
        })
    }
}

#[async_trait]
impl ExtractFields for LlmFieldExtractor {
    async fn extract(&self, description: &str) -> Result<JobFields, ExtractError> {
        while self.limiter.check().is_err() {
            warn!(
                "extract-call budget exhausted, sleeping {}s before retrying",
                self.backoff.as_secs()
            );
            tokio::time::sleep(self.backoff).await;
        }

        let reply = self
            .agent
            .prompt(description.to_string())
            .await
            .map_err(|e| ExtractError::Provider(e.to_string()))?;
        parse_fields_reply(&reply)
    }
}

/// Parse the model reply, tolerating markdown code fences.
fn parse_fields_reply(reply: &str) -> Result<JobFields, ExtractError> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(120).collect();
        ExtractError::Parse(format!("{e}; reply started with: {preview}"))
    })
}
