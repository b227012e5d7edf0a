//! Worker pool: seeds the frontier and runs N drivers against one store

use crate::config::Config;
use crate::crawler::{build_http_client, CrawlContext, CrawlDriver, CrawlReport, DriverOptions, ProcessingBudget};
use crate::extract::ContentExtractor;
use crate::storage::FrontierStore;
use crate::url::{Canonicalizer, InclusionFilter};
use crate::CrawlError;
use std::sync::Arc;
use std::time::Instant;

/// Parameters of one crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Seed URL; also defines the base domain
    pub base_domain: String,
    /// Maximum fetch attempts across all workers
    pub max_urls_to_process: usize,
    pub only_base_domain_urls: bool,
    pub num_workers: usize,
}

/// Runs a complete crawl
///
/// 1. Seeds the base URL into `seen` if absent
/// 2. Spawns `num_workers` tokio tasks, each a [`CrawlDriver`] loop
/// 3. Merges the per-worker reports
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Every worker finished
/// * `Err(CrawlError)` - Setup failed, or a worker could not read the
///   frontier (the merged report is still logged)
pub async fn run_crawl(
    store: Arc<dyn FrontierStore>,
    config: &Config,
    options: &CrawlOptions,
) -> Result<CrawlReport, CrawlError> {
    let canonicalizer = Canonicalizer::new(&options.base_domain)?;
    let client = build_http_client(&config.crawler)?;

    let seed = canonicalizer.base_url().to_string();
    tracing::info!("Total URLs in the store: {}", store.count_seen()?);
    if store.add_seen(&seed, None, None)? {
        tracing::info!("Seeded frontier with {}", seed);
    }

    let ctx = Arc::new(CrawlContext {
        store: Arc::clone(&store),
        client,
        canonicalizer,
        filter: InclusionFilter::new(config.exclusion_rules()),
        extractor: ContentExtractor::new(config.extraction.clone()),
        budget: ProcessingBudget::new(options.max_urls_to_process),
        options: DriverOptions {
            only_base_domain_urls: options.only_base_domain_urls,
            batch_size: config.crawler.batch_size,
        },
    });

    let start_time = Instant::now();
    let handles: Vec<_> = (0..options.num_workers.max(1))
        .map(|worker| {
            let driver = CrawlDriver::new(worker, Arc::clone(&ctx));
            tokio::spawn(async move { driver.run().await })
        })
        .collect();

    let mut total = CrawlReport::default();
    let mut first_error = None;
    for (worker, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(CrawlError::Worker {
                worker,
                message: e.to_string(),
            }),
        };

        match outcome {
            Ok(report) => total.merge(&report),
            Err(e) => {
                tracing::error!("Worker {} stopped: {}", worker, e);
                first_error.get_or_insert(e);
            }
        }
    }

    tracing::info!(
        "Crawl finished in {:?}: {}",
        start_time.elapsed(),
        total
    );
    tracing::info!("Total URLs in the store: {}", store.count_seen()?);

    match first_error {
        Some(e) => Err(e),
        None => Ok(total),
    }
}
