//! Offline consistency and dedup repairs
//!
//! Two independent passes over an existing store:
//! - [`resanitize`]: re-canonicalize, re-filter and re-sanitize one record set
//! - [`dedup_fetched`]: collapse fetched content rows sharing a body fingerprint
//!
//! Both are idempotent and support a dry run that performs no mutation. They
//! delete and reinsert rows, so they must not run while a crawl is writing to
//! the same store.

mod dedup;
mod resanitize;

pub use dedup::{dedup_fetched, select_representative};
pub use resanitize::resanitize;

use crate::storage::{FrontierStore, StorageResult};
use crate::url::{Canonicalizer, InclusionFilter};
use std::fmt;

/// Record set targeted by the re-sanitize pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RepairTarget {
    Seen,
    Crawled,
    Forbidden,
    Fetched,
}

impl fmt::Display for RepairTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = match self {
            RepairTarget::Seen => "seen_urls",
            RepairTarget::Crawled => "crawled_urls",
            RepairTarget::Forbidden => "forbidden_urls",
            RepairTarget::Fetched => "fetched_content",
        };
        f.write_str(table)
    }
}

/// Outcome of one repair pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub examined: u64,
    pub unchanged: u64,
    /// Rows deleted and written back in corrected form
    pub rewritten: u64,
    pub removed: u64,
    /// Rewrites whose new key already held a row
    pub collisions: u64,
}

impl RepairReport {
    /// Rows a real run changes (or a dry run would change)
    pub fn mutations(&self) -> u64 {
        self.rewritten + self.removed
    }
}

impl fmt::Display for RepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "examined {}, unchanged {}, rewritten {}, removed {}, collisions {}",
            self.examined, self.unchanged, self.rewritten, self.removed, self.collisions
        )
    }
}

/// What a repair run should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairOptions {
    pub target: RepairTarget,
    pub dedup: bool,
    pub dry_run: bool,
}

/// Reports of a full repair run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub resanitize: RepairReport,
    pub dedup: Option<RepairReport>,
}

/// Runs the re-sanitize pass and, when requested, the dedup pass after it
pub fn run_repair(
    store: &dyn FrontierStore,
    canonicalizer: &Canonicalizer,
    filter: &InclusionFilter,
    options: RepairOptions,
) -> StorageResult<RepairSummary> {
    let resanitized = resanitize(store, canonicalizer, filter, options.target, options.dry_run)?;
    let dedup = if options.dedup {
        Some(dedup_fetched(store, options.dry_run)?)
    } else {
        None
    };

    Ok(RepairSummary {
        resanitize: resanitized,
        dedup,
    })
}
