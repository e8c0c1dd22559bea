//! Application layer - use cases around the crawling core.
//!
//! Discovery feeds the store, the readiness check reports whether another
//! run is worthwhile, and export dumps cleaned listings as a CSV feed.

pub mod discovery;
pub mod export;
pub mod readiness;

pub use discovery::{DiscoveryReport, DiscoveryService};
pub use export::export_listings_csv;
pub use readiness::{Readiness, check_pending_listings};
