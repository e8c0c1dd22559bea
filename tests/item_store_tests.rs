//! Store-level properties: idempotent inserts, atomic claims, idempotent
//! outcome writes, and the operational reset.

use chrono::Utc;
use std::collections::HashSet;
use tempfile::TempDir;

use jobharvest::domain::{CrawlStatus, FailureKind, JobFields, JobListing};
use jobharvest::infrastructure::{DatabaseConnection, ItemStore};

async fn open_store(dir: &TempDir) -> (DatabaseConnection, ItemStore) {
    let url = format!("sqlite:{}", dir.path().join("store.db").display());
    let db = DatabaseConnection::new(&url).await.unwrap();
    db.migrate().await.unwrap();
    let store = ItemStore::new(db.pool().clone());
    (db, store)
}

fn listing(url: &str) -> JobListing {
    JobListing {
        title: "Engineer".to_string(),
        company: Some("Acme".to_string()),
        url: url.to_string(),
        location: Some("Dhaka".to_string()),
        salary: None,
        page: 1,
        scraped_at: Utc::now(),
    }
}

async fn seed(store: &ItemStore, count: usize) -> Vec<String> {
    let mut urls = Vec::new();
    for i in 0..count {
        let url = format!("https://jobs.example.com/j/{i}");
        assert!(store.insert_listing(&listing(&url)).await.unwrap());
        urls.push(url);
    }
    urls
}

#[tokio::test]
async fn duplicate_insert_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;

    let job = listing("https://jobs.example.com/j/1");
    assert!(store.insert_listing(&job).await.unwrap());
    // Same key again, even with different metadata: ignored.
    let mut rediscovered = job.clone();
    rediscovered.title = "Engineer (repost)".to_string();
    assert!(!store.insert_listing(&rediscovered).await.unwrap());

    assert_eq!(
        store.count_listings_with_status(&CrawlStatus::New).await.unwrap(),
        1
    );
    let rows = store.all_listings().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Engineer");
    db.close().await;
}

#[tokio::test]
async fn claims_are_disjoint_and_flip_status() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    seed(&store, 5).await;

    let first: HashSet<String> = store.claim_listing_batch(3).await.unwrap().into_iter().collect();
    let second: HashSet<String> = store.claim_listing_batch(3).await.unwrap().into_iter().collect();
    assert_eq!(first.len(), 3);
    // Only two NEW rows were left; a batch larger than the pool takes them all.
    assert_eq!(second.len(), 2);
    assert!(first.is_disjoint(&second));

    assert_eq!(
        store.count_listings_with_status(&CrawlStatus::New).await.unwrap(),
        0
    );
    assert_eq!(
        store
            .count_listings_with_status(&CrawlStatus::InProgress)
            .await
            .unwrap(),
        5
    );

    // Nothing NEW left: further claims come back empty, never re-claiming
    // IN_PROGRESS rows.
    assert!(store.claim_listing_batch(3).await.unwrap().is_empty());
    db.close().await;
}

#[tokio::test]
async fn claims_prefer_oldest_rows() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let urls = seed(&store, 4).await;

    let claimed: HashSet<String> =
        store.claim_listing_batch(2).await.unwrap().into_iter().collect();
    let oldest: HashSet<String> = urls[..2].iter().cloned().collect();
    assert_eq!(claimed, oldest);
    db.close().await;
}

#[tokio::test]
async fn recording_a_description_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let urls = seed(&store, 1).await;
    store.claim_listing_batch(1).await.unwrap();

    store.record_description(&urls[0], "We are hiring.").await.unwrap();
    // Redelivery of the same outcome converges to the same state.
    store.record_description(&urls[0], "We are hiring.").await.unwrap();

    assert_eq!(
        store.listing_status(&urls[0]).await.unwrap(),
        Some(CrawlStatus::Done)
    );
    assert_eq!(
        store.description_body(&urls[0]).await.unwrap().as_deref(),
        Some("We are hiring.")
    );
    assert_eq!(
        store
            .count_descriptions_with_status(&CrawlStatus::New)
            .await
            .unwrap(),
        1
    );
    db.close().await;
}

#[tokio::test]
async fn failure_labels_survive_a_round_trip() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let urls = seed(&store, 3).await;
    store.claim_listing_batch(3).await.unwrap();

    store
        .set_listing_status(&urls[0], &CrawlStatus::Failed(FailureKind::Http(404)))
        .await
        .unwrap();
    store
        .set_listing_status(&urls[1], &CrawlStatus::Failed(FailureKind::Timeout))
        .await
        .unwrap();
    store
        .set_listing_status(
            &urls[2],
            &CrawlStatus::Failed(FailureKind::other("tls handshake eof")),
        )
        .await
        .unwrap();

    assert_eq!(
        store.listing_status(&urls[0]).await.unwrap(),
        Some(CrawlStatus::Failed(FailureKind::Http(404)))
    );
    assert_eq!(
        store.listing_status(&urls[1]).await.unwrap(),
        Some(CrawlStatus::Failed(FailureKind::Timeout))
    );
    assert_eq!(
        store.listing_status(&urls[2]).await.unwrap(),
        Some(CrawlStatus::Failed(FailureKind::other("tls handshake eof")))
    );
    db.close().await;
}

#[tokio::test]
async fn reset_recovers_stranded_and_optionally_failed_rows() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let urls = seed(&store, 4).await;
    store.claim_listing_batch(4).await.unwrap();

    // One done, one failed, two stranded IN_PROGRESS (simulated crash).
    store.record_description(&urls[0], "body").await.unwrap();
    store
        .set_listing_status(&urls[1], &CrawlStatus::Failed(FailureKind::Dns))
        .await
        .unwrap();

    let reset = store.reset_listings(false).await.unwrap();
    assert_eq!(reset, 2);
    assert_eq!(
        store.count_listings_with_status(&CrawlStatus::New).await.unwrap(),
        2
    );
    // DONE and the failure label are untouched.
    assert_eq!(
        store.listing_status(&urls[0]).await.unwrap(),
        Some(CrawlStatus::Done)
    );
    assert_eq!(
        store.listing_status(&urls[1]).await.unwrap(),
        Some(CrawlStatus::Failed(FailureKind::Dns))
    );

    // Including failures sweeps the DNS row back in, but never DONE.
    let reset = store.reset_listings(true).await.unwrap();
    assert_eq!(reset, 1);
    assert_eq!(
        store.count_listings_with_status(&CrawlStatus::New).await.unwrap(),
        3
    );
    assert_eq!(
        store.listing_status(&urls[0]).await.unwrap(),
        Some(CrawlStatus::Done)
    );
    db.close().await;
}

#[tokio::test]
async fn description_claims_hand_out_bodies() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let urls = seed(&store, 2).await;
    store.claim_listing_batch(2).await.unwrap();
    store.record_description(&urls[0], "first body").await.unwrap();
    store.record_description(&urls[1], "second body").await.unwrap();

    let claimed = store.claim_description_batch(10).await.unwrap();
    assert_eq!(claimed.len(), 2);
    let first = claimed.iter().find(|d| d.url == urls[0]).unwrap();
    assert_eq!(first.body, "first body");
    assert_eq!(
        store
            .count_descriptions_with_status(&CrawlStatus::InProgress)
            .await
            .unwrap(),
        2
    );
    assert!(store.claim_description_batch(10).await.unwrap().is_empty());
    db.close().await;
}

#[tokio::test]
async fn recording_fields_is_idempotent_and_marks_done() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let urls = seed(&store, 1).await;
    store.claim_listing_batch(1).await.unwrap();
    store.record_description(&urls[0], "body").await.unwrap();
    store.claim_description_batch(1).await.unwrap();

    let fields = JobFields {
        responsibilities: "Ship".to_string(),
        requirements: "Rust".to_string(),
        ..JobFields::default()
    };
    store.record_fields(&urls[0], &fields).await.unwrap();
    store.record_fields(&urls[0], &fields).await.unwrap();

    assert_eq!(
        store
            .count_descriptions_with_status(&CrawlStatus::Done)
            .await
            .unwrap(),
        1
    );
    db.close().await;
}

#[tokio::test]
async fn status_counts_group_by_label() {
    let dir = TempDir::new().unwrap();
    let (db, store) = open_store(&dir).await;
    let urls = seed(&store, 3).await;
    store.claim_listing_batch(2).await.unwrap();
    store
        .set_listing_status(&urls[0], &CrawlStatus::Failed(FailureKind::Timeout))
        .await
        .unwrap();

    let counts = store.listing_status_counts().await.unwrap();
    let lookup = |label: &str| {
        counts
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };
    assert_eq!(lookup("NEW"), 1);
    assert_eq!(lookup("IN_PROGRESS"), 1);
    assert_eq!(lookup("TIMEOUT"), 1);
    db.close().await;
}
