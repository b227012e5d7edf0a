//! Storage module for the persistent frontier
//!
//! This module owns the four record sets that make a crawl resumable:
//! - `seen_urls`: every discovered canonical URL
//! - `crawled_urls`: URLs whose fetch completed with a usable result
//! - `forbidden_urls`: URLs that must not be retried
//! - `fetched_content`: extracted heading/body rows with fingerprints
//!
//! The crawl driver and the repair tool mutate these only through
//! [`FrontierStore`].

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{FrontierStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Opens (creating if needed) the store at `path`
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Store opened and schema ensured
/// * `Err(StorageError)` - The path could not be opened as a database
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// Order in which batch reads return URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadOrder {
    /// Most recently seen first
    #[default]
    Recent,
    /// Random order, so concurrent or repeated runs do not revisit the same
    /// slice of the frontier
    Random,
}

/// A row of `seen_urls`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRecord {
    pub url: String,
    pub seen_time: DateTime<Utc>,
    pub crawl_time: Option<DateTime<Utc>>,
}

/// A row of `crawled_urls`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledRecord {
    pub url: String,
    pub seen_time: Option<DateTime<Utc>>,
    pub crawl_time: DateTime<Utc>,
}

/// A row of `fetched_content`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub url: String,
    pub heading: String,
    pub body: String,
    pub heading_hash: String,
    pub body_hash: String,
}

impl FetchedContent {
    /// Returns true when every field required for storage is non-empty
    pub fn is_complete(&self) -> bool {
        [
            &self.url,
            &self.heading,
            &self.body,
            &self.heading_hash,
            &self.body_hash,
        ]
        .iter()
        .all(|field| !field.is_empty())
    }
}
