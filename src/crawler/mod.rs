//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a bounded timeout
//! - The shared processing budget
//! - The per-worker crawl loop
//! - The worker pool that runs a crawl end to end

mod budget;
mod driver;
mod fetcher;
mod pool;
mod report;

pub use budget::ProcessingBudget;
pub use driver::{CrawlContext, CrawlDriver, DriverOptions};
pub use fetcher::{build_http_client, fetch_url, FetchResult, MAX_REDIRECTS};
pub use pool::{run_crawl, CrawlOptions};
pub use report::CrawlReport;
