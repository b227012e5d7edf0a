//! Kosh-Crawler main entry point
//!
//! This is the command-line interface for the resumable crawl driver.

use anyhow::Context;
use clap::Parser;
use kosh_crawler::config::load_config_or_default;
use kosh_crawler::crawler::{run_crawl, CrawlOptions};
use kosh_crawler::logging::{init_logging, LOG_LEVELS};
use kosh_crawler::output::{load_statistics, print_statistics};
use kosh_crawler::storage::{open_store, FrontierStore};
use kosh_crawler::Canonicalizer;
use std::path::PathBuf;
use std::sync::Arc;

/// Kosh-Crawler: a resumable single-domain content crawler
///
/// Crawls one domain starting at its base URL, stores heading/body content of
/// every page that has it, and keeps the URL frontier in SQLite so the next
/// run continues where this one stopped.
#[derive(Parser, Debug)]
#[command(name = "kosh-crawler")]
#[command(version)]
#[command(about = "A resumable single-domain content crawler", long_about = None)]
struct Cli {
    /// Base URL to start the crawl from; defines the crawl domain
    #[arg(long, required_unless_present = "stats")]
    base_domain: Option<String>,

    /// Maximum number of fetch attempts in this run
    #[arg(long, required_unless_present = "stats", value_parser = clap::value_parser!(u64).range(1..))]
    max_urls_to_process: Option<u64>,

    /// Path to the SQLite store
    #[arg(long, default_value = "kosh_crawler.db")]
    db_path: PathBuf,

    /// Only follow links and redirects on the base domain
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    only_base_domain_urls: bool,

    /// Drop and recreate every table before crawling (destructive)
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    reset_tables: bool,

    /// Number of concurrent crawl workers
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    num_workers: u64,

    /// Logging level; RUST_LOG overrides it when set
    #[arg(long, default_value = "info", value_parser = clap::builder::PossibleValuesParser::new(LOG_LEVELS))]
    log_level: String,

    /// Optional TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show statistics from the store and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let store = Arc::new(
        open_store(&cli.db_path)
            .with_context(|| format!("Failed to open store at {}", cli.db_path.display()))?,
    );

    if cli.stats {
        let stats = load_statistics(store.as_ref()).context("Failed to load statistics")?;
        print_statistics(&stats);
        return Ok(());
    }

    let base_domain = cli.base_domain.context("--base-domain is required")?;
    let max_urls_to_process = cli
        .max_urls_to_process
        .context("--max-urls-to-process is required")?;

    // Reject a bad base URL before anything destructive happens
    Canonicalizer::new(&base_domain)
        .with_context(|| format!("Invalid --base-domain {}", base_domain))?;

    if cli.reset_tables {
        tracing::warn!("Resetting all tables in {}", cli.db_path.display());
        store.reset_all().context("Failed to reset tables")?;
    }

    let options = CrawlOptions {
        base_domain,
        max_urls_to_process: max_urls_to_process as usize,
        only_base_domain_urls: cli.only_base_domain_urls,
        num_workers: cli.num_workers as usize,
    };
    tracing::info!(
        "Crawling {} with {} worker(s), budget {}",
        options.base_domain,
        options.num_workers,
        options.max_urls_to_process
    );

    let report = run_crawl(store, &config, &options).await?;

    println!(
        "Total visited: {}, num new urls found: {}, num fetched: {}, no contents: {}",
        report.visited, report.new_urls, report.content_fetched, report.no_content
    );

    Ok(())
}
