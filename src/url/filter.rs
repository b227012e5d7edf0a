//! Static URL inclusion filter
//!
//! A single ordered table of exclusion rules decides whether a URL is worth
//! fetching at all. The filter carries no state; the first matching rule wins
//! and its reason is reported for logging.

use crate::url::canonicalize::path_and_query;

/// How an exclusion rule matches a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matches when the URL contains the substring anywhere
    Contains(String),

    /// Matches when the URL string starts with the prefix
    Prefix(String),

    /// Matches when the URL's path (and query) starts with the prefix
    PathPrefix(String),
}

/// One row of the exclusion table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    pub pattern: Pattern,
    pub reason: String,
}

impl ExclusionRule {
    pub fn contains(pattern: &str, reason: &str) -> Self {
        Self {
            pattern: Pattern::Contains(pattern.to_string()),
            reason: reason.to_string(),
        }
    }

    pub fn prefix(pattern: &str, reason: &str) -> Self {
        Self {
            pattern: Pattern::Prefix(pattern.to_string()),
            reason: reason.to_string(),
        }
    }

    pub fn path_prefix(pattern: &str, reason: &str) -> Self {
        Self {
            pattern: Pattern::PathPrefix(pattern.to_string()),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this rule excludes the URL (case-sensitive)
    pub fn matches(&self, url: &str) -> bool {
        match &self.pattern {
            Pattern::Contains(needle) => url.contains(needle.as_str()),
            Pattern::Prefix(prefix) => url.starts_with(prefix.as_str()),
            Pattern::PathPrefix(prefix) => path_and_query(url).starts_with(prefix.as_str()),
        }
    }
}

/// Rules that apply regardless of configuration: non-navigable schemes
pub fn scheme_rules() -> Vec<ExclusionRule> {
    vec![
        ExclusionRule::prefix("javascript:", "script pseudo-link"),
        ExclusionRule::prefix("mailto:", "mail link"),
        ExclusionRule::prefix("tel:", "phone link"),
        ExclusionRule::prefix("data:", "inline data URI"),
    ]
}

/// The built-in exclusion table for MediaWiki-style sites
pub fn default_rules() -> Vec<ExclusionRule> {
    vec![
        ExclusionRule::contains(":Random", "random page redirector"),
        ExclusionRule::contains("MobileEditor", "mobile editor"),
        ExclusionRule::contains("&printable", "printable duplicate"),
        ExclusionRule::contains("oldid", "historical revision"),
        ExclusionRule::contains("&search=", "search results"),
        ExclusionRule::contains("&limit=", "pagination listing"),
        ExclusionRule::contains("action=", "page action"),
        ExclusionRule::contains("mobileaction", "mobile view toggle"),
        ExclusionRule::contains("returnto", "login redirect"),
        ExclusionRule::contains("RecentChangesLinked", "change log"),
        ExclusionRule::contains("otherapps", "app promotion"),
        ExclusionRule::contains("hidelinks", "link listing"),
        ExclusionRule::contains("hideredirs", "redirect listing"),
        ExclusionRule::path_prefix("/share", "share widget"),
        ExclusionRule::path_prefix("/kk/images", "image asset"),
    ]
}

/// Ordered exclusion table evaluated by [`InclusionFilter::is_excluded`]
#[derive(Debug, Clone)]
pub struct InclusionFilter {
    rules: Vec<ExclusionRule>,
}

impl InclusionFilter {
    /// Builds a filter from configured rules; scheme rules are always prepended
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        let mut all = scheme_rules();
        all.extend(rules);
        Self { rules: all }
    }

    /// Builds a filter with the built-in table
    pub fn with_defaults() -> Self {
        Self::new(default_rules())
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    /// Returns the reason of the first rule that excludes the URL
    pub fn exclusion_reason(&self, url: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(url))
            .map(|rule| rule.reason.as_str())
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclusion_reason(url).is_some()
    }
}

impl Default for InclusionFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
