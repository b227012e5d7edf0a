//! Crawl driver - the per-worker crawl loop
//!
//! Each worker drains random batches from the frontier and moves every URL
//! it fetches to exactly one terminal set:
//!
//! ```text
//! discovered -> fetch-attempted -> crawled (+ content-fetched)
//!                               -> forbidden
//! ```
//!
//! Stale frontier rows (excluded under the current rules, or stored in a
//! non-canonical form whose canonical URL is already terminal) leave the
//! frontier when visited, so they never crowd out fetchable URLs.
//!
//! Per-URL failures are recorded and absorbed here; only a failure to read
//! the frontier ends the worker with an error.

use crate::crawler::{fetch_url, CrawlReport, FetchResult, ProcessingBudget};
use crate::extract::{harvest_links, ContentExtractor, ExtractError, ExtractedContent, HtmlDocument};
use crate::storage::{FrontierStore, ReadOrder, StorageResult};
use crate::url::{classify_link, Canonicalizer, InclusionFilter, LinkVerdict};
use crate::CrawlError;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Run-wide settings every worker shares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Only enqueue links (and follow redirects) on the base domain
    pub only_base_domain_urls: bool,
    /// Frontier URLs pulled per batch
    pub batch_size: usize,
}

/// Everything a worker needs, shared read-only between workers
pub struct CrawlContext {
    pub store: Arc<dyn FrontierStore>,
    pub client: Client,
    pub canonicalizer: Canonicalizer,
    pub filter: InclusionFilter,
    pub extractor: ContentExtractor,
    pub budget: ProcessingBudget,
    pub options: DriverOptions,
}

/// Terminal state given to a fetched URL (and to its redirect source)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Crawled,
    Forbidden,
}

/// What visiting one frontier row did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// A fetch was attempted
    Fetched,
    /// The row left the frontier without a fetch
    Retired,
    /// Nothing changed: budget refused or a store write failed
    Untouched,
}

/// Parsed page data; owned so no parser state lives across an `.await`
struct PageAnalysis {
    content: Result<ExtractedContent, ExtractError>,
    links: Vec<String>,
}

fn analyze_page(body: &str, extractor: &ContentExtractor) -> PageAnalysis {
    let doc = HtmlDocument::parse(body);
    PageAnalysis {
        content: extractor.extract_page(&doc),
        links: harvest_links(&doc),
    }
}

/// One sequential crawl loop over the shared store
pub struct CrawlDriver {
    worker: usize,
    ctx: Arc<CrawlContext>,
}

impl CrawlDriver {
    pub fn new(worker: usize, ctx: Arc<CrawlContext>) -> Self {
        Self { worker, ctx }
    }

    /// Runs until the budget is spent or the frontier is drained
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Counters for this worker
    /// * `Err(CrawlError)` - The frontier could not be read
    pub async fn run(&self) -> Result<CrawlReport, CrawlError> {
        let mut report = CrawlReport::default();
        tracing::debug!("Worker {} starting", self.worker);

        loop {
            if self.ctx.budget.is_exhausted() {
                tracing::info!(
                    "Worker {}: processing budget of {} exhausted",
                    self.worker,
                    self.ctx.budget.limit()
                );
                break;
            }

            let batch = self
                .ctx
                .store
                .read_frontier(self.ctx.options.batch_size, ReadOrder::Random)?;
            if batch.is_empty() {
                tracing::info!("Worker {}: frontier is empty", self.worker);
                break;
            }

            let mut progressed = false;
            for url in &batch {
                if self.ctx.budget.is_exhausted() {
                    break;
                }
                if self.process_url(url, &mut report).await != Visit::Untouched {
                    progressed = true;
                }
            }

            // Every row stayed put; the next batch would be the same
            if !progressed && !self.ctx.budget.is_exhausted() {
                tracing::warn!(
                    "Worker {}: a batch of {} made no progress, stopping",
                    self.worker,
                    batch.len()
                );
                break;
            }

            tracing::info!(
                "Worker {} progress: {} fetched, {} new urls, {} budget left",
                self.worker,
                report.fetch_attempts,
                report.new_urls,
                self.ctx.budget.remaining()
            );
        }

        Ok(report)
    }

    /// Processes one frontier row; never fails the worker
    async fn process_url(&self, stored: &str, report: &mut CrawlReport) -> Visit {
        let ctx = &self.ctx;
        report.visited += 1;

        // The stored form may predate a canonicalization rule change
        let url = ctx.canonicalizer.canonicalize(stored);
        tracing::debug!("Processing url: {}", url);

        if let Some(reason) = ctx.filter.exclusion_reason(&url) {
            tracing::debug!("Dropping excluded url {} ({})", stored, reason);
            report.skipped += 1;
            return match ctx.store.remove_seen(stored) {
                Ok(_) => Visit::Retired,
                Err(_) => Visit::Untouched,
            };
        }
        if self.is_terminal(&url) {
            tracing::debug!("Url already crawled or forbidden. Skipping: {}", url);
            report.skipped += 1;
            return if self.settle_alias(stored, &url) {
                Visit::Retired
            } else {
                Visit::Untouched
            };
        }

        if !ctx.budget.try_acquire() {
            return Visit::Untouched;
        }
        report.fetch_attempts += 1;

        self.fetch_and_record(&url, report).await;
        self.settle_alias(stored, &url);
        Visit::Fetched
    }

    /// Fetches a canonical URL and moves it to its terminal state
    async fn fetch_and_record(&self, url: &str, report: &mut CrawlReport) {
        let ctx = &self.ctx;

        let (final_url, body) = match fetch_url(&ctx.client, url).await {
            FetchResult::Success {
                final_url, body, ..
            } => (final_url, body),
            failure => {
                tracing::info!("Could not fetch {}: {}", url, failure);
                self.drop_failed_fetch(url, report);
                return;
            }
        };

        let target = ctx.canonicalizer.canonicalize(&final_url);
        let effective = if target == url {
            url.to_string()
        } else {
            match self.follow_redirect(url, &target, report) {
                Some(effective) => effective,
                None => return,
            }
        };
        let source = (effective != url).then_some(url);

        let page = analyze_page(&body, &ctx.extractor);
        match page.content {
            Ok(content) => self.store_content(&effective, content, report),
            Err(e) => {
                match e {
                    ExtractError::NoContentMarker => report.no_content += 1,
                    ExtractError::MissingHeading | ExtractError::MissingBody => {
                        report.partial_content += 1
                    }
                }
                tracing::debug!("{}: {}. Skipping collecting links.", effective, e);
                self.record_outcome(&effective, source, Outcome::Forbidden, report);
                return;
            }
        }

        self.record_outcome(&effective, source, Outcome::Crawled, report);
        self.enqueue_links(&final_url, &page.links, report);
    }

    /// Resolves a redirect to its canonical target
    ///
    /// Returns the effective URL to continue with, or `None` when the source
    /// has been given its terminal state and processing should stop.
    fn follow_redirect(&self, source: &str, target: &str, report: &mut CrawlReport) -> Option<String> {
        let ctx = &self.ctx;
        tracing::debug!("{} redirected to {}", source, target);

        match classify_link(
            target,
            &ctx.canonicalizer,
            &ctx.filter,
            ctx.options.only_base_domain_urls,
        ) {
            LinkVerdict::Enqueue => {}
            verdict => {
                tracing::debug!("Dropping redirect {} -> {} ({:?})", source, target, verdict);
                report.dropped_redirects += 1;
                self.forbid(source, report);
                return None;
            }
        }

        if let Ok(true) = ctx.store.add_seen(target, None, None) {
            report.new_urls += 1;
        }

        // Another source already led here; share its terminal state
        if self.check(ctx.store.is_crawled(target)) {
            self.record_crawled(source, report);
            return None;
        }
        if self.check(ctx.store.is_forbidden(target)) {
            self.forbid(source, report);
            return None;
        }

        Some(target.to_string())
    }

    fn store_content(&self, url: &str, content: ExtractedContent, report: &mut CrawlReport) {
        let store = &self.ctx.store;
        if self.check(store.is_content_fetched(url)) {
            tracing::debug!("Content already stored for {}", url);
            return;
        }

        match store.add_fetched_content(&content.into_record(url)) {
            Ok(true) => report.content_fetched += 1,
            Ok(false) => tracing::debug!("Content for {} was stored concurrently", url),
            Err(e) => tracing::warn!("Storing content for {} failed: {}", url, e),
        }
    }

    /// Harvests links, resolving hrefs against the page's final URL
    fn enqueue_links(&self, page_url: &str, hrefs: &[String], report: &mut CrawlReport) {
        let ctx = &self.ctx;
        let base = Url::parse(page_url).ok();
        tracing::debug!("All href links in the page {}", hrefs.len());

        let mut added = 0u64;
        for href in hrefs {
            let resolved = base
                .as_ref()
                .and_then(|base| base.join(href).ok())
                .map(String::from)
                .unwrap_or_else(|| href.clone());
            let link = ctx.canonicalizer.canonicalize(&resolved);

            if classify_link(
                &link,
                &ctx.canonicalizer,
                &ctx.filter,
                ctx.options.only_base_domain_urls,
            ) != LinkVerdict::Enqueue
            {
                continue;
            }
            if self.check(ctx.store.is_forbidden(&link)) {
                continue;
            }
            if let Ok(true) = ctx.store.add_seen(&link, None, None) {
                added += 1;
            }
        }

        tracing::debug!("Number of new URLs found: {}", added);
        report.new_urls += added;
    }

    /// Records the outcome for the effective URL and its redirect source
    fn record_outcome(
        &self,
        effective: &str,
        source: Option<&str>,
        outcome: Outcome,
        report: &mut CrawlReport,
    ) {
        for url in std::iter::once(effective).chain(source) {
            match outcome {
                Outcome::Crawled => self.record_crawled(url, report),
                Outcome::Forbidden => self.forbid(url, report),
            }
        }
    }

    fn record_crawled(&self, url: &str, report: &mut CrawlReport) {
        match self.ctx.store.add_crawled(url, None, None) {
            Ok(true) => report.crawled += 1,
            Ok(false) => {}
            // Leaves the URL retryable on a later run
            Err(e) => tracing::error!("Adding {} to crawled failed: {}", url, e),
        }
    }

    fn forbid(&self, url: &str, report: &mut CrawlReport) {
        match self.ctx.store.add_forbidden(url) {
            Ok(true) => report.forbidden += 1,
            Ok(false) => {}
            Err(e) => tracing::error!("Adding {} to forbidden failed: {}", url, e),
        }
    }

    /// A failed fetch leaves the seen set and becomes forbidden
    fn drop_failed_fetch(&self, url: &str, report: &mut CrawlReport) {
        if let Err(e) = self.ctx.store.remove_seen(url) {
            tracing::warn!("Removing {} from seen failed: {}", url, e);
        }
        self.forbid(url, report);
    }

    /// Gives a non-canonical stored row the terminal state of its canonical
    /// form; returns true once the row has left the frontier
    fn settle_alias(&self, stored: &str, url: &str) -> bool {
        if stored == url {
            return true;
        }
        let result = if self.check(self.ctx.store.is_crawled(url)) {
            self.ctx.store.add_crawled(stored, None, None)
        } else if self.check(self.ctx.store.is_forbidden(url)) {
            self.ctx.store.add_forbidden(stored)
        } else {
            return false;
        };

        match result {
            Ok(_) => {
                tracing::debug!("{} settled with its canonical form {}", stored, url);
                true
            }
            Err(e) => {
                tracing::warn!("Settling {} failed: {}", stored, e);
                false
            }
        }
    }

    fn is_terminal(&self, url: &str) -> bool {
        self.check(self.ctx.store.is_crawled(url)) || self.check(self.ctx.store.is_forbidden(url))
    }

    /// Reads a predicate; the store has already logged any failure
    fn check(&self, result: StorageResult<bool>) -> bool {
        result.unwrap_or(false)
    }
}
