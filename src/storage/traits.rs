//! Storage traits and error types
//!
//! This module defines the trait interface for the frontier store and
//! associated error types.

use crate::storage::{CrawledRecord, FetchedContent, ReadOrder, SeenRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned by a panicked worker")]
    LockPoisoned,

    #[error("Invalid timestamp in {table}: {value}")]
    Timestamp { table: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent record of URL lifecycle state, keyed by canonical URL
///
/// Every operation is safe to call concurrently from several workers holding
/// the same store. Inserts are atomic "insert if absent": they return
/// `Ok(true)` when a row was written and `Ok(false)` when the URL already had
/// a row or a required field was empty, so a racing duplicate insert is a
/// no-op rather than an error. Failures are logged by the store and returned;
/// the store never terminates the process.
pub trait FrontierStore: Send + Sync {
    // ===== Inserts =====

    /// Records a discovered URL; `seen_time` defaults to now
    fn add_seen(
        &self,
        url: &str,
        seen_time: Option<DateTime<Utc>>,
        crawl_time: Option<DateTime<Utc>>,
    ) -> StorageResult<bool>;

    /// Records a completed fetch; `crawl_time` defaults to now
    fn add_crawled(
        &self,
        url: &str,
        seen_time: Option<DateTime<Utc>>,
        crawl_time: Option<DateTime<Utc>>,
    ) -> StorageResult<bool>;

    /// Records a URL that yielded no usable outcome
    fn add_forbidden(&self, url: &str) -> StorageResult<bool>;

    /// Stores extracted content; rejects rows with any empty field
    fn add_fetched_content(&self, content: &FetchedContent) -> StorageResult<bool>;

    // ===== Existence predicates =====

    fn is_seen(&self, url: &str) -> StorageResult<bool>;

    fn is_crawled(&self, url: &str) -> StorageResult<bool>;

    fn is_forbidden(&self, url: &str) -> StorageResult<bool>;

    fn is_content_fetched(&self, url: &str) -> StorageResult<bool>;

    // ===== Deletions =====
    // Each returns true when a row was removed.

    fn remove_seen(&self, url: &str) -> StorageResult<bool>;

    fn remove_crawled(&self, url: &str) -> StorageResult<bool>;

    fn remove_forbidden(&self, url: &str) -> StorageResult<bool>;

    fn remove_fetched_content(&self, url: &str) -> StorageResult<bool>;

    // ===== Reads =====

    /// Returns seen URLs with `seen_time` strictly before `max_time`
    /// (default now), most recent first unless `order` is random
    fn read_seen(
        &self,
        max_time: Option<DateTime<Utc>>,
        limit: usize,
        order: ReadOrder,
    ) -> StorageResult<Vec<String>>;

    /// Returns seen URLs that are neither crawled nor forbidden
    fn read_frontier(&self, limit: usize, order: ReadOrder) -> StorageResult<Vec<String>>;

    /// Returns crawled URLs with `crawl_time` strictly before `max_time`
    /// (default now), most recent first
    fn read_crawled(
        &self,
        max_time: Option<DateTime<Utc>>,
        limit: usize,
    ) -> StorageResult<Vec<String>>;

    /// Returns the stored content row for a URL
    fn read_fetched_content(&self, url: &str) -> StorageResult<Option<FetchedContent>>;

    /// Returns all URLs sharing a body fingerprint, in insertion order
    fn get_matching_content(&self, body_hash: &str) -> StorageResult<Vec<String>>;

    /// Returns body fingerprints stored for more than one URL
    fn duplicate_body_hashes(&self) -> StorageResult<Vec<String>>;

    // ===== Paginated full-row reads (insertion order) =====

    fn seen_records(&self, limit: usize, offset: usize) -> StorageResult<Vec<SeenRecord>>;

    fn crawled_records(&self, limit: usize, offset: usize) -> StorageResult<Vec<CrawledRecord>>;

    fn forbidden_urls(&self, limit: usize, offset: usize) -> StorageResult<Vec<String>>;

    fn fetched_records(&self, limit: usize, offset: usize)
        -> StorageResult<Vec<FetchedContent>>;

    // ===== Statistics =====

    fn count_seen(&self) -> StorageResult<u64>;

    fn count_crawled(&self) -> StorageResult<u64>;

    fn count_forbidden(&self) -> StorageResult<u64>;

    fn count_fetched(&self) -> StorageResult<u64>;

    /// Counts seen URLs that are neither crawled nor forbidden
    fn count_frontier(&self) -> StorageResult<u64>;

    // ===== Maintenance =====

    /// Drops and recreates all four record sets
    fn reset_all(&self) -> StorageResult<()>;
}
