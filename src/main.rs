//! jobharvest CLI - operator interface to the crawling pipeline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use jobharvest::application::{
    DiscoveryService, Readiness, check_pending_listings, export_listings_csv,
};
use jobharvest::crawling::{BatchRunner, DescriptionCrawler, FieldExtractionStage};
use jobharvest::infrastructure::{
    AppConfig, DatabaseConnection, HttpClient, ItemStore, LlmFieldExtractor, PageParser,
    init_logging,
};

#[derive(Parser)]
#[command(
    name = "jobharvest",
    about = "Batch job-board crawler and structured-data-extraction pipeline"
)]
struct Cli {
    /// TOML config file (defaults to ./jobharvest.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl listing pages and insert discovered jobs as NEW
    Discover {
        /// First listing page to fetch
        #[arg(long)]
        first_page: Option<u32>,
        /// Last listing page to fetch
        #[arg(long)]
        last_page: Option<u32>,
    },
    /// Drain NEW listings in batches, fetching and extracting descriptions
    Crawl {
        /// Rows claimed per batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// Stop after this many batches
        #[arg(long)]
        max_batches: Option<u32>,
    },
    /// Drain NEW descriptions through the language-model field extractor
    Extract {
        /// Rows claimed per batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// Stop after this many batches
        #[arg(long)]
        max_batches: Option<u32>,
    },
    /// Report pending work: exit 0 = work available, 1 = none, 2 = check failed
    Check,
    /// Rewrite stranded IN_PROGRESS rows back to NEW
    Reset {
        /// Reset the description table instead of the listing table
        #[arg(long)]
        descriptions: bool,
        /// Also reset failure-labeled rows
        #[arg(long)]
        include_failures: bool,
    },
    /// Print per-status row counts for both tables
    Stats,
    /// Export cleaned listings to a CSV feed
    Export {
        /// Output file
        #[arg(long, default_value = "output/jobs.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    let _log_guard = init_logging(&config.logging)?;

    match cli.command {
        Command::Discover {
            first_page,
            last_page,
        } => {
            if let Some(first) = first_page {
                config.discovery.first_page = first;
            }
            if let Some(last) = last_page {
                config.discovery.last_page = last;
            }
            let db = open_store(&config).await?;
            let store = ItemStore::new(db.pool().clone());
            let fetcher = Arc::new(HttpClient::new(&config.http)?);
            let parser = Arc::new(PageParser::new()?);
            let service =
                DiscoveryService::new(fetcher, parser, store, config.discovery.clone());
            let report = service.run().await;
            db.close().await;
            let report = report?;
            println!(
                "discovered {} new listings ({} duplicates, {} dropped, {} page failures)",
                report.inserted, report.duplicates, report.dropped, report.pages_failed
            );
        }
        Command::Crawl {
            batch_size,
            max_batches,
        } => {
            apply_batch_overrides(&mut config, batch_size, max_batches);
            let db = open_store(&config).await?;
            let store = ItemStore::new(db.pool().clone());
            let fetcher = Arc::new(HttpClient::new(&config.http)?);
            let parser = Arc::new(PageParser::new()?);
            let runner = BatchRunner::new(
                DescriptionCrawler::new(store, fetcher, parser),
                config.batch.clone(),
            );
            let summary = runner.run().await;
            db.close().await;
            let summary = summary?;
            println!(
                "crawled {} listings over {} batches: {} done, {} empty, {} failed",
                summary.claimed, summary.batches, summary.succeeded, summary.empty, summary.failed
            );
        }
        Command::Extract {
            batch_size,
            max_batches,
        } => {
            apply_batch_overrides(&mut config, batch_size, max_batches);
            let db = open_store(&config).await?;
            let store = ItemStore::new(db.pool().clone());
            let extractor = Arc::new(LlmFieldExtractor::from_env(&config.llm)?);
            let runner = BatchRunner::new(
                FieldExtractionStage::new(store, extractor),
                config.batch.clone(),
            );
            let summary = runner.run().await;
            db.close().await;
            let summary = summary?;
            println!(
                "extracted fields for {} descriptions over {} batches: {} done, {} empty, {} failed",
                summary.claimed, summary.batches, summary.succeeded, summary.empty, summary.failed
            );
        }
        Command::Check => {
            let readiness = check_pending_listings(&config.database.url).await;
            match &readiness {
                Readiness::WorkAvailable(count) => println!("{count} NEW listing(s) found"),
                Readiness::NoWork => println!("no NEW listings found"),
                Readiness::CheckFailed(reason) => eprintln!("readiness check failed: {reason}"),
            }
            let code = readiness.exit_code();
            drop(_log_guard);
            std::process::exit(code);
        }
        Command::Reset {
            descriptions,
            include_failures,
        } => {
            let db = open_store(&config).await?;
            let store = ItemStore::new(db.pool().clone());
            let result = if descriptions {
                store.reset_descriptions(include_failures).await
            } else {
                store.reset_listings(include_failures).await
            };
            db.close().await;
            println!("reset {} row(s) to NEW", result?);
        }
        Command::Stats => {
            let db = open_store(&config).await?;
            let store = ItemStore::new(db.pool().clone());
            let listings = store.listing_status_counts().await;
            let descriptions = store.description_status_counts().await;
            db.close().await;
            println!("job_listings:");
            for (label, count) in listings? {
                println!("  {label:<24} {count}");
            }
            println!("job_descriptions:");
            for (label, count) in descriptions? {
                println!("  {label:<24} {count}");
            }
        }
        Command::Export { out } => {
            let db = open_store(&config).await?;
            let store = ItemStore::new(db.pool().clone());
            let written = export_listings_csv(&store, &out).await;
            db.close().await;
            println!("wrote {} listing(s) to {}", written?, out.display());
        }
    }

    Ok(())
}

/// Open the store and make sure the schema exists.
async fn open_store(config: &AppConfig) -> Result<DatabaseConnection> {
    info!(url = %config.database.url, "opening store");
    let db = DatabaseConnection::new(&config.database.url).await?;
    db.migrate().await?;
    Ok(db)
}

fn apply_batch_overrides(
    config: &mut AppConfig,
    batch_size: Option<usize>,
    max_batches: Option<u32>,
) {
    if let Some(size) = batch_size {
        config.batch.batch_size = size;
    }
    if let Some(max) = max_batches {
        config.batch.max_batches = Some(max);
    }
}
