//! Dedup pass over fetched content
//!
//! Rows sharing a body fingerprint collapse to one representative: the row
//! with the shortest heading, ties going to the earliest stored row.

use crate::repair::RepairReport;
use crate::storage::{FetchedContent, FrontierStore, StorageResult};

/// Picks the row to keep from a duplicate group
pub fn select_representative(group: &[FetchedContent]) -> Option<&FetchedContent> {
    // min_by_key keeps the first of equal minima
    group.iter().min_by_key(|row| row.heading.chars().count())
}

/// Runs the dedup pass
///
/// # Returns
///
/// * `Ok(RepairReport)` - `examined` counts rows in duplicate groups,
///   `rewritten` the representatives, `removed` the dropped duplicates
/// * `Err(StorageError)` - Reading or mutating the store failed
pub fn dedup_fetched(store: &dyn FrontierStore, dry_run: bool) -> StorageResult<RepairReport> {
    let mut report = RepairReport::default();

    for body_hash in store.duplicate_body_hashes()? {
        let mut group = Vec::new();
        for url in store.get_matching_content(&body_hash)? {
            if let Some(row) = store.read_fetched_content(&url)? {
                group.push(row);
            }
        }
        if group.len() < 2 {
            continue;
        }

        let Some(keep) = select_representative(&group).cloned() else {
            continue;
        };
        tracing::debug!(
            "Body {} shared by {} urls; keeping {} ({})",
            body_hash,
            group.len(),
            keep.url,
            keep.heading
        );

        report.examined += group.len() as u64;
        report.removed += group.len() as u64 - 1;
        report.rewritten += 1;

        if dry_run {
            continue;
        }
        for row in &group {
            store.remove_fetched_content(&row.url)?;
        }
        if !store.add_fetched_content(&keep)? {
            tracing::warn!("Reinserting representative {} wrote no row", keep.url);
        }
    }

    tracing::info!(
        "Dedup of fetched content{}: {}",
        if dry_run { " (dry run)" } else { "" },
        report
    );
    Ok(report)
}
