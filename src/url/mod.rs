//! URL handling module
//!
//! This module provides URL canonicalization, base-domain classification and
//! the static inclusion filter applied before any URL is fetched or enqueued.

mod canonicalize;
mod filter;

pub use canonicalize::Canonicalizer;
pub use filter::{default_rules, scheme_rules, ExclusionRule, InclusionFilter, Pattern};

/// Why a discovered link was not enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkVerdict {
    /// The link should be added to the seen set
    Enqueue,
    /// An exclusion rule matched
    Excluded,
    /// The link points off the base domain while domain filtering is on
    OffDomain,
}

/// Classifies a canonical URL for enqueueing
///
/// Evaluation order: inclusion filter first, then the base-domain check when
/// `only_base_domain` is set.
pub fn classify_link(
    url: &str,
    canonicalizer: &Canonicalizer,
    filter: &InclusionFilter,
    only_base_domain: bool,
) -> LinkVerdict {
    if filter.is_excluded(url) {
        return LinkVerdict::Excluded;
    }

    if only_base_domain && !canonicalizer.is_from_base_domain(url) {
        return LinkVerdict::OffDomain;
    }

    LinkVerdict::Enqueue
}
