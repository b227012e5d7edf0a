//! Re-sanitize pass
//!
//! Brings every row of one record set in line with the current
//! canonicalization, exclusion and sanitizing rules. All rows are read before
//! the first mutation, and the pass plans against an in-memory copy of the
//! table so a dry run reports exactly what a real run would do.

use crate::extract::{fingerprint, sanitize};
use crate::repair::{RepairReport, RepairTarget};
use crate::storage::{CrawledRecord, FetchedContent, FrontierStore, SeenRecord, StorageResult};
use crate::url::{Canonicalizer, InclusionFilter};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

const PAGE_SIZE: usize = 500;

/// A row the pass can relocate, repair and write back
trait RepairRecord: Clone + PartialEq + Sized {
    fn url(&self) -> &str;

    fn relocate(self, url: String) -> Self;

    /// Re-applies content sanitizing; identity for URL-only tables
    fn resanitized(self) -> Self {
        self
    }

    /// False when the repaired row can no longer be stored
    fn is_storable(&self) -> bool {
        true
    }

    /// Combines this row with the row already stored under its new key
    fn merge(self, existing: Self) -> Self;

    fn load_page(store: &dyn FrontierStore, limit: usize, offset: usize) -> StorageResult<Vec<Self>>;

    fn remove(store: &dyn FrontierStore, url: &str) -> StorageResult<bool>;

    fn insert(&self, store: &dyn FrontierStore) -> StorageResult<bool>;
}

fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

impl RepairRecord for SeenRecord {
    fn url(&self) -> &str {
        &self.url
    }

    fn relocate(self, url: String) -> Self {
        Self { url, ..self }
    }

    fn merge(self, existing: Self) -> Self {
        Self {
            url: self.url,
            seen_time: self.seen_time.min(existing.seen_time),
            crawl_time: earliest(self.crawl_time, existing.crawl_time),
        }
    }

    fn load_page(store: &dyn FrontierStore, limit: usize, offset: usize) -> StorageResult<Vec<Self>> {
        store.seen_records(limit, offset)
    }

    fn remove(store: &dyn FrontierStore, url: &str) -> StorageResult<bool> {
        store.remove_seen(url)
    }

    fn insert(&self, store: &dyn FrontierStore) -> StorageResult<bool> {
        store.add_seen(&self.url, Some(self.seen_time), self.crawl_time)
    }
}

impl RepairRecord for CrawledRecord {
    fn url(&self) -> &str {
        &self.url
    }

    fn relocate(self, url: String) -> Self {
        Self { url, ..self }
    }

    fn merge(self, existing: Self) -> Self {
        Self {
            url: self.url,
            seen_time: earliest(self.seen_time, existing.seen_time),
            crawl_time: self.crawl_time.min(existing.crawl_time),
        }
    }

    fn load_page(store: &dyn FrontierStore, limit: usize, offset: usize) -> StorageResult<Vec<Self>> {
        store.crawled_records(limit, offset)
    }

    fn remove(store: &dyn FrontierStore, url: &str) -> StorageResult<bool> {
        store.remove_crawled(url)
    }

    fn insert(&self, store: &dyn FrontierStore) -> StorageResult<bool> {
        store.add_crawled(&self.url, self.seen_time, Some(self.crawl_time))
    }
}

/// A row of `forbidden_urls`
#[derive(Debug, Clone, PartialEq, Eq)]
struct ForbiddenRecord(String);

impl RepairRecord for ForbiddenRecord {
    fn url(&self) -> &str {
        &self.0
    }

    fn relocate(self, url: String) -> Self {
        Self(url)
    }

    fn merge(self, _existing: Self) -> Self {
        self
    }

    fn load_page(store: &dyn FrontierStore, limit: usize, offset: usize) -> StorageResult<Vec<Self>> {
        Ok(store
            .forbidden_urls(limit, offset)?
            .into_iter()
            .map(ForbiddenRecord)
            .collect())
    }

    fn remove(store: &dyn FrontierStore, url: &str) -> StorageResult<bool> {
        store.remove_forbidden(url)
    }

    fn insert(&self, store: &dyn FrontierStore) -> StorageResult<bool> {
        store.add_forbidden(&self.0)
    }
}

impl RepairRecord for FetchedContent {
    fn url(&self) -> &str {
        &self.url
    }

    fn relocate(self, url: String) -> Self {
        Self { url, ..self }
    }

    fn resanitized(self) -> Self {
        let heading = sanitize(&self.heading);
        let body = sanitize(&self.body);
        Self {
            url: self.url,
            heading_hash: fingerprint(&heading),
            body_hash: fingerprint(&body),
            heading,
            body,
        }
    }

    fn is_storable(&self) -> bool {
        self.is_complete()
    }

    // The row already stored under the canonical key wins while it is
    // still complete
    fn merge(self, existing: Self) -> Self {
        if existing.is_complete() {
            Self {
                url: self.url,
                ..existing
            }
        } else {
            self
        }
    }

    fn load_page(store: &dyn FrontierStore, limit: usize, offset: usize) -> StorageResult<Vec<Self>> {
        store.fetched_records(limit, offset)
    }

    fn remove(store: &dyn FrontierStore, url: &str) -> StorageResult<bool> {
        store.remove_fetched_content(url)
    }

    fn insert(&self, store: &dyn FrontierStore) -> StorageResult<bool> {
        store.add_fetched_content(self)
    }
}

/// Runs the re-sanitize pass over one record set
///
/// # Returns
///
/// * `Ok(RepairReport)` - What was (or, in dry-run mode, would be) changed
/// * `Err(StorageError)` - Reading or mutating the store failed
pub fn resanitize(
    store: &dyn FrontierStore,
    canonicalizer: &Canonicalizer,
    filter: &InclusionFilter,
    target: RepairTarget,
    dry_run: bool,
) -> StorageResult<RepairReport> {
    let pass = Pass {
        store,
        canonicalizer,
        filter,
        dry_run,
    };

    let report = match target {
        RepairTarget::Seen => pass.run::<SeenRecord>()?,
        RepairTarget::Crawled => pass.run::<CrawledRecord>()?,
        RepairTarget::Forbidden => pass.run::<ForbiddenRecord>()?,
        RepairTarget::Fetched => pass.run::<FetchedContent>()?,
    };

    tracing::info!(
        "Re-sanitize of {}{}: {}",
        target,
        if dry_run { " (dry run)" } else { "" },
        report
    );
    Ok(report)
}

struct Pass<'a> {
    store: &'a dyn FrontierStore,
    canonicalizer: &'a Canonicalizer,
    filter: &'a InclusionFilter,
    dry_run: bool,
}

impl Pass<'_> {
    fn run<R: RepairRecord>(&self) -> StorageResult<RepairReport> {
        let rows = self.load_all::<R>()?;
        let order: Vec<String> = rows.iter().map(|row| row.url().to_string()).collect();
        let mut table: HashMap<String, R> = rows
            .into_iter()
            .map(|row| (row.url().to_string(), row))
            .collect();
        let mut written: HashSet<String> = HashSet::new();
        let mut report = RepairReport::default();

        for url in &order {
            report.examined += 1;
            if written.contains(url) {
                continue;
            }
            let Some(row) = table.get(url).cloned() else {
                continue;
            };

            let canonical = self.canonicalizer.canonicalize(url);
            let fixed = row.clone().relocate(canonical.clone()).resanitized();

            if self.filter.is_excluded(&canonical) || !fixed.is_storable() {
                tracing::debug!("Removing {}", url);
                table.remove(url);
                report.removed += 1;
                self.remove::<R>(url)?;
                continue;
            }

            if canonical == *url {
                if fixed == row {
                    report.unchanged += 1;
                } else {
                    tracing::debug!("Re-sanitizing content of {}", url);
                    self.remove::<R>(url)?;
                    self.insert(&fixed)?;
                    table.insert(canonical.clone(), fixed);
                    written.insert(canonical);
                    report.rewritten += 1;
                }
                continue;
            }

            tracing::debug!("Rewriting {} as {}", url, canonical);
            table.remove(url);
            self.remove::<R>(url)?;

            let merged = match table.remove(&canonical) {
                Some(existing) => {
                    // Both keys exist; clear the new one before reinserting
                    report.collisions += 1;
                    self.remove::<R>(&canonical)?;
                    fixed.merge(existing.resanitized())
                }
                None => fixed,
            };

            self.insert(&merged)?;
            table.insert(canonical.clone(), merged);
            written.insert(canonical);
            report.rewritten += 1;
        }

        Ok(report)
    }

    fn load_all<R: RepairRecord>(&self) -> StorageResult<Vec<R>> {
        let mut rows = Vec::new();
        loop {
            let page = R::load_page(self.store, PAGE_SIZE, rows.len())?;
            let done = page.len() < PAGE_SIZE;
            rows.extend(page);
            if done {
                break;
            }
        }
        Ok(rows)
    }

    fn remove<R: RepairRecord>(&self, url: &str) -> StorageResult<()> {
        if !self.dry_run {
            R::remove(self.store, url)?;
        }
        Ok(())
    }

    fn insert<R: RepairRecord>(&self, row: &R) -> StorageResult<()> {
        if !self.dry_run && !row.insert(self.store)? {
            tracing::warn!("Reinserting {} wrote no row", row.url());
        }
        Ok(())
    }
}
