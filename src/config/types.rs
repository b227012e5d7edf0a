use crate::extract::ElementSelector;
use crate::url::{default_rules, ExclusionRule, Pattern};
use serde::Deserialize;

/// Main configuration structure, loaded from an optional TOML file
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// configuration for MediaWiki-style poetry pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Ordered exclusion rules; empty means the built-in table
    #[serde(default)]
    pub exclude: Vec<ExclusionEntry>,
}

impl Config {
    /// Returns the exclusion table this configuration selects
    ///
    /// Entries are assumed to be validated; an entry without a pattern is
    /// skipped.
    pub fn exclusion_rules(&self) -> Vec<ExclusionRule> {
        if self.exclude.is_empty() {
            return default_rules();
        }

        self.exclude
            .iter()
            .filter_map(|entry| {
                entry.pattern().map(|pattern| ExclusionRule {
                    pattern,
                    reason: entry.reason.clone(),
                })
            })
            .collect()
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of frontier URLs pulled per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    format!("kosh-crawler/{}", env!("CARGO_PKG_VERSION"))
}

/// Structural selectors for the content extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtractionConfig {
    #[serde(default = "default_heading")]
    pub heading: ElementSelector,

    #[serde(default = "default_body")]
    pub body: ElementSelector,

    /// Element whose presence marks a page without content
    #[serde(default = "default_no_content")]
    pub no_content: ElementSelector,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            heading: default_heading(),
            body: default_body(),
            no_content: default_no_content(),
        }
    }
}

fn default_heading() -> ElementSelector {
    ElementSelector::new("h1", "class", "firstHeading")
}

fn default_body() -> ElementSelector {
    ElementSelector::new("div", "class", "poem")
}

fn default_no_content() -> ElementSelector {
    ElementSelector::new("div", "class", "noarticletext")
}

/// One `[[exclude]]` entry; exactly one pattern field must be set
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExclusionEntry {
    pub contains: Option<String>,
    pub prefix: Option<String>,
    pub path_prefix: Option<String>,
    #[serde(default)]
    pub reason: String,
}

impl ExclusionEntry {
    /// Number of pattern fields set on this entry
    pub fn pattern_count(&self) -> usize {
        [&self.contains, &self.prefix, &self.path_prefix]
            .iter()
            .filter(|field| field.is_some())
            .count()
    }

    /// Returns the first pattern set on this entry
    pub fn pattern(&self) -> Option<Pattern> {
        if let Some(needle) = &self.contains {
            return Some(Pattern::Contains(needle.clone()));
        }
        if let Some(prefix) = &self.prefix {
            return Some(Pattern::Prefix(prefix.clone()));
        }
        self.path_prefix.clone().map(Pattern::PathPrefix)
    }
}
