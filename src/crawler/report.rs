//! Per-run crawl counters

use std::fmt;

/// Counters collected by one worker, merged across workers at the end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// URLs taken from a frontier batch
    pub visited: u64,
    /// Fetches issued (the budgeted quantity)
    pub fetch_attempts: u64,
    /// Rows written to `crawled_urls`
    pub crawled: u64,
    /// Rows written to `forbidden_urls`
    pub forbidden: u64,
    /// Rows written to `fetched_content`
    pub content_fetched: u64,
    /// Pages carrying the "no content" marker
    pub no_content: u64,
    /// Pages missing a heading or body
    pub partial_content: u64,
    /// Redirects to excluded or off-domain targets
    pub dropped_redirects: u64,
    /// Links newly added to `seen_urls`
    pub new_urls: u64,
    /// Batch URLs skipped without a fetch (excluded or already terminal)
    pub skipped: u64,
}

impl CrawlReport {
    pub fn merge(&mut self, other: &CrawlReport) {
        self.visited += other.visited;
        self.fetch_attempts += other.fetch_attempts;
        self.crawled += other.crawled;
        self.forbidden += other.forbidden;
        self.content_fetched += other.content_fetched;
        self.no_content += other.no_content;
        self.partial_content += other.partial_content;
        self.dropped_redirects += other.dropped_redirects;
        self.new_urls += other.new_urls;
        self.skipped += other.skipped;
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visited {}, fetched {}, crawled {}, forbidden {}, content {}, no content {}, \
             partial {}, dropped redirects {}, new urls {}, skipped {}",
            self.visited,
            self.fetch_attempts,
            self.crawled,
            self.forbidden,
            self.content_fetched,
            self.no_content,
            self.partial_content,
            self.dropped_redirects,
            self.new_urls,
            self.skipped
        )
    }
}
