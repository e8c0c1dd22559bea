//! Listing-page discovery producer.
//!
//! Walks the paginated search results with bounded concurrency, cleans each
//! parsed card, and inserts survivors as `NEW` work items. Page failures and
//! dropped cards are isolated: they are logged and counted, never fatal.

use anyhow::{Context, Result};
use futures::{StreamExt, stream};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::infrastructure::config::DiscoveryConfig;
use crate::infrastructure::html_parser::PageParser;
use crate::infrastructure::http_client::Fetch;
use crate::infrastructure::item_store::ItemStore;

/// Counters for one discovery run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub cards_seen: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub dropped: u64,
}

/// Crawls listing pages and feeds cleaned listings into the store.
pub struct DiscoveryService {
    fetcher: Arc<dyn Fetch>,
    parser: Arc<PageParser>,
    store: ItemStore,
    config: DiscoveryConfig,
}

impl DiscoveryService {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        parser: Arc<PageParser>,
        store: ItemStore,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            fetcher,
            parser,
            store,
            config,
        }
    }

    /// Fetch every configured listing page and insert what survives
    /// cleaning. Store errors abort the run; page errors do not.
    pub async fn run(&self) -> Result<DiscoveryReport> {
        let base_url = Url::parse(&self.config.search_url)
            .with_context(|| format!("invalid search URL {}", self.config.search_url))?;
        let mut report = DiscoveryReport::default();

        let pages = self.config.first_page..=self.config.last_page;
        let fetches = stream::iter(pages.map(|page| {
            let fetcher = Arc::clone(&self.fetcher);
            let url = self.config.page_url(page);
            async move { (page, fetcher.fetch_text(&url).await) }
        }))
        .buffer_unordered(self.config.max_concurrent_pages.max(1));
        futures::pin_mut!(fetches);

        while let Some((page, result)) = fetches.next().await {
            let html = match result {
                Ok(html) => html,
                Err(error) => {
                    warn!(page, %error, "listing page fetch failed, skipping");
                    report.pages_failed += 1;
                    continue;
                }
            };
            report.pages_fetched += 1;

            let cards = self.parser.parse_listings(&html, page);
            if cards.is_empty() {
                warn!(page, "no listing cards found on page");
            }
            for raw in cards {
                report.cards_seen += 1;
                let listing = match raw.clean(&base_url) {
                    Ok(listing) => listing,
                    Err(error) => {
                        warn!(page, %error, "dropping listing");
                        report.dropped += 1;
                        continue;
                    }
                };
                if self.store.insert_listing(&listing).await? {
                    report.inserted += 1;
                } else {
                    debug!(url = %listing.url, "already discovered");
                    report.duplicates += 1;
                }
            }
        }

        info!(
            pages_fetched = report.pages_fetched,
            pages_failed = report.pages_failed,
            inserted = report.inserted,
            duplicates = report.duplicates,
            dropped = report.dropped,
            "discovery finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use crate::infrastructure::http_client::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct StubFetcher {
        pages: HashMap<String, Result<String, FetchError>>,
    }

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.pages
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Other(format!("no stub for {url}"))))
        }
    }

    fn listing_page(cards: &[(&str, &str)]) -> String {
        let mut html = String::from("<html><body><ul class=\"jobs\">");
        for (title, href) in cards {
            html.push_str(&format!(
                "<li><article><header><h2><a href=\"{href}\">{title}</a></h2></header>\
                 <p class=\"company\">Acme</p></article></li>"
            ));
        }
        html.push_str("</ul></body></html>");
        html
    }

    async fn store(dir: &TempDir) -> ItemStore {
        let url = format!("sqlite:{}", dir.path().join("discovery.db").display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        db.migrate().await.unwrap();
        ItemStore::new(db.pool().clone())
    }

    #[tokio::test]
    async fn discovers_cleans_and_deduplicates() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let config = DiscoveryConfig {
            search_url: "https://jobs.example.com/jobs?l=all".to_string(),
            first_page: 1,
            last_page: 3,
            max_concurrent_pages: 2,
        };

        let mut pages = HashMap::new();
        pages.insert(
            config.page_url(1),
            Ok(listing_page(&[("Backend Engineer", "/job/1"), ("Data Analyst", "/job/2")])),
        );
        // Page 2 repeats job 2 and adds a card with no title.
        let mut page_two = listing_page(&[("Data Analyst", "/job/2")]);
        page_two = page_two.replace(
            "</ul>",
            "<li><article><header><h2><a href=\"/job/3\"></a></h2></header></article></li></ul>",
        );
        pages.insert(config.page_url(2), Ok(page_two));
        pages.insert(
            config.page_url(3),
            Err(FetchError::Timeout("deadline elapsed".to_string())),
        );

        let service = DiscoveryService::new(
            Arc::new(StubFetcher { pages }),
            Arc::new(PageParser::new().unwrap()),
            store.clone(),
            config,
        );
        let report = service.run().await.unwrap();

        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.cards_seen, 4);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.dropped, 1);

        // Both survivors are NEW and the duplicate did not clobber anything.
        let claimable = store.claim_listing_batch(10).await.unwrap();
        assert_eq!(claimable.len(), 2);
        assert!(claimable.contains(&"https://jobs.example.com/job/1".to_string()));
        assert!(claimable.contains(&"https://jobs.example.com/job/2".to_string()));
    }
}
