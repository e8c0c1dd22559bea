//! HTML parsing for listing pages and detail pages.
//!
//! Selector strings live in a config struct so a different job board only
//! needs new selectors, not new code. Parsing is lenient: a card missing a
//! field yields an empty fragment list and the cleaning pipeline decides
//! whether the listing survives.

use anyhow::{Context, Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::domain::RawListing;

/// CSS selectors describing one job board's markup.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// One listing card on a search-results page.
    pub job_card: String,
    /// Title anchor inside a card; its `href` is the detail link.
    pub title_link: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    /// Description container on a detail page.
    pub description: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            job_card: "ul.jobs li article".to_string(),
            title_link: "header h2 a".to_string(),
            company: "p.company".to_string(),
            location: "ul.location li".to_string(),
            salary: "ul.salary li".to_string(),
            description: "section.content".to_string(),
        }
    }
}

/// Parser for both page shapes, selectors compiled once at construction.
pub struct PageParser {
    job_card: Selector,
    title_link: Selector,
    company: Selector,
    location: Selector,
    salary: Selector,
    description: Selector,
}

impl PageParser {
    /// Create a parser with default selectors.
    pub fn new() -> Result<Self> {
        Self::with_config(&SelectorConfig::default())
    }

    /// Create a parser with custom selectors.
    pub fn with_config(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            job_card: parse_selector(&config.job_card)?,
            title_link: parse_selector(&config.title_link)?,
            company: parse_selector(&config.company)?,
            location: parse_selector(&config.location)?,
            salary: parse_selector(&config.salary)?,
            description: parse_selector(&config.description)?,
        })
    }

    /// Extract raw listings from a search-results page.
    pub fn parse_listings(&self, html: &str, page: u32) -> Vec<RawListing> {
        let document = Html::parse_document(html);
        let listings: Vec<RawListing> = document
            .select(&self.job_card)
            .map(|card| {
                let title_link = card.select(&self.title_link).next();
                RawListing {
                    title: title_link.map(|el| text_fragments(el).join(" ")),
                    link: title_link.and_then(|el| el.value().attr("href").map(str::to_string)),
                    company: card
                        .select(&self.company)
                        .flat_map(|el| text_fragments(el))
                        .collect(),
                    location: card
                        .select(&self.location)
                        .flat_map(|el| text_fragments(el))
                        .collect(),
                    salary: card
                        .select(&self.salary)
                        .flat_map(|el| text_fragments(el))
                        .collect(),
                    page,
                }
            })
            .collect();
        debug!("parsed {} listing cards from page {page}", listings.len());
        listings
    }

    /// Extract the description text from a detail page, whitespace
    /// normalized. `None` when the container is missing or holds no text.
    pub fn extract_description(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let joined = document
            .select(&self.description)
            .flat_map(|el| text_fragments(el))
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() { None } else { Some(joined) }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("invalid selector '{selector}'"))
}

/// Whitespace-normalized text fragments under an element.
fn text_fragments(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_PAGE: &str = r#"
        <html><body>
        <ul class="jobs">
          <li><article>
            <header><h2><a href="/job/backend-1">Backend Engineer</a></h2></header>
            <p class="company">Acme <span>Corp</span></p>
            <ul class="location"><li>Dhaka</li></ul>
            <ul class="salary"><li>৳ 20,000 - 30,000</li></ul>
          </article></li>
          <li><article>
            <header><h2><a href="https://jobs.example.com/job/data-2">Data Analyst</a></h2></header>
            <p class="company"></p>
          </article></li>
          <li><article>
            <header><h2>No link here</h2></header>
          </article></li>
        </ul>
        </body></html>
    "#;

    #[test]
    fn parses_listing_cards() {
        let parser = PageParser::new().unwrap();
        let listings = parser.parse_listings(LISTING_PAGE, 7);
        assert_eq!(listings.len(), 3);

        let first = &listings[0];
        assert_eq!(first.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(first.link.as_deref(), Some("/job/backend-1"));
        assert_eq!(first.company, vec!["Acme", "Corp"]);
        assert_eq!(first.location, vec!["Dhaka"]);
        assert_eq!(first.page, 7);

        let second = &listings[1];
        assert_eq!(second.link.as_deref(), Some("https://jobs.example.com/job/data-2"));
        assert!(second.company.is_empty());

        // Card without a title anchor still comes back raw; cleaning drops it.
        assert_eq!(listings[2].title, None);
        assert_eq!(listings[2].link, None);
    }

    #[test]
    fn extracts_description_text() {
        let parser = PageParser::new().unwrap();
        let html = r#"
            <html><body><section class="content">
              <p>We are hiring.</p>
              <p>  Requirements:   Rust, SQL. </p>
            </section></body></html>
        "#;
        assert_eq!(
            parser.extract_description(html).as_deref(),
            Some("We are hiring. Requirements: Rust, SQL.")
        );
    }

    #[test]
    fn empty_description_is_none() {
        let parser = PageParser::new().unwrap();
        assert_eq!(parser.extract_description("<html><body></body></html>"), None);
        assert_eq!(
            parser.extract_description(
                r#"<html><body><section class="content">   </section></body></html>"#
            ),
            None
        );
    }

    #[test]
    fn bad_selector_is_rejected() {
        let config = SelectorConfig {
            job_card: ":::not a selector".to_string(),
            ..SelectorConfig::default()
        };
        assert!(PageParser::with_config(&config).is_err());
    }
}
