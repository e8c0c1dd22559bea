//! CSV feed export for cleaned listings.

use anyhow::{Context, Result};
use std::path::Path;

use crate::infrastructure::item_store::ItemStore;

/// Write every stored listing (including its status label) to a CSV file.
/// Returns the number of rows written.
pub async fn export_listings_csv(store: &ItemStore, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let listings = store.all_listings().await?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    for listing in &listings {
        writer.serialize(listing)?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(listings.len() as u64)
}
