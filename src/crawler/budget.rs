//! Processing budget shared by all workers of a run

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hard cap on fetch attempts across every worker of one run
///
/// A slot is taken immediately before a fetch is issued, never for URLs that
/// are skipped, so the cap counts attempted fetches only.
#[derive(Debug)]
pub struct ProcessingBudget {
    limit: usize,
    used: AtomicUsize,
}

impl ProcessingBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    /// Takes one slot; returns false once the cap is reached
    pub fn try_acquire(&self) -> bool {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn is_exhausted(&self) -> bool {
        self.used() >= self.limit
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
