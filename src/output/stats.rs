//! Statistics generation from the frontier store
//!
//! This module provides functionality for extracting and displaying
//! frontier statistics from the storage layer.

use crate::storage::{FrontierStore, StorageResult};

/// Frontier statistics summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStatistics {
    /// Every discovered URL
    pub seen: u64,

    pub crawled: u64,

    pub forbidden: u64,

    /// Pages with stored heading/body content
    pub fetched: u64,

    /// Seen URLs that are neither crawled nor forbidden
    pub frontier: u64,
}

impl FrontierStatistics {
    /// Share of crawled pages that yielded content, as a percentage
    pub fn content_yield(&self) -> f64 {
        if self.crawled == 0 {
            return 0.0;
        }
        (self.fetched as f64 / self.crawled as f64) * 100.0
    }
}

/// Loads statistics from storage
///
/// # Returns
///
/// * `Ok(FrontierStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(store: &dyn FrontierStore) -> StorageResult<FrontierStatistics> {
    Ok(FrontierStatistics {
        seen: store.count_seen()?,
        crawled: store.count_crawled()?,
        forbidden: store.count_forbidden()?,
        fetched: store.count_fetched()?,
        frontier: store.count_frontier()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &FrontierStatistics) {
    println!("=== Frontier Statistics ===\n");

    println!("  Seen URLs:       {}", stats.seen);
    println!("  Crawled URLs:    {}", stats.crawled);
    println!("  Forbidden URLs:  {}", stats.forbidden);
    println!("  Fetched content: {} ({:.1}% of crawled)", stats.fetched, stats.content_yield());
    println!("  Frontier:        {}", stats.frontier);
}
