//! Kosh-Repair: offline consistency and dedup tool for a crawl store
//!
//! Must not run while a crawl is writing to the same store.

use anyhow::Context;
use clap::Parser;
use kosh_crawler::config::load_config_or_default;
use kosh_crawler::logging::{init_logging, LOG_LEVELS};
use kosh_crawler::repair::{run_repair, RepairOptions, RepairTarget};
use kosh_crawler::storage::open_store;
use kosh_crawler::{Canonicalizer, InclusionFilter};
use std::path::PathBuf;

/// Re-canonicalizes, re-filters and deduplicates stored crawl records
#[derive(Parser, Debug)]
#[command(name = "kosh-repair")]
#[command(version)]
#[command(about = "Repairs and deduplicates a kosh-crawler store", long_about = None)]
struct Cli {
    /// Record set for the re-sanitize pass
    #[arg(long, value_enum)]
    repair_target: RepairTarget,

    /// Base URL the store was crawled from
    #[arg(long)]
    base_domain: String,

    /// Also collapse fetched content sharing a body fingerprint
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    dedup: bool,

    /// Report what would change without writing
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    dry_run: bool,

    /// Path to the SQLite store
    #[arg(long, default_value = "kosh_crawler.db")]
    db_path: PathBuf,

    /// Optional TOML configuration file (exclusion rules)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Logging level; RUST_LOG overrides it when set
    #[arg(long, default_value = "info", value_parser = clap::builder::PossibleValuesParser::new(LOG_LEVELS))]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let canonicalizer = Canonicalizer::new(&cli.base_domain)
        .with_context(|| format!("Invalid --base-domain {}", cli.base_domain))?;
    let filter = InclusionFilter::new(config.exclusion_rules());
    let store = open_store(&cli.db_path)
        .with_context(|| format!("Failed to open store at {}", cli.db_path.display()))?;

    if cli.dry_run {
        tracing::info!("Dry run: no rows will be changed");
    }

    let summary = run_repair(
        &store,
        &canonicalizer,
        &filter,
        RepairOptions {
            target: cli.repair_target,
            dedup: cli.dedup,
            dry_run: cli.dry_run,
        },
    )
    .context("Repair failed")?;

    println!("{}: {}", cli.repair_target, summary.resanitize);
    if let Some(dedup) = summary.dedup {
        println!("fetched_content dedup: {}", dedup);
    }

    Ok(())
}
