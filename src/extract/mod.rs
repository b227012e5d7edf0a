//! Content extraction module
//!
//! Turns a fetched page into a sanitized heading/body pair plus the list of
//! outbound hrefs. Extraction never panics on page shape: a missing or empty
//! element is reported through [`ExtractError`] and the caller decides what
//! to record.

mod content;
mod document;

pub use content::{
    extract, fingerprint, harvest_links, sanitize, ContentExtractor, ExtractedContent,
};
pub use document::{DocumentView, ElementView, HtmlDocument};

use serde::Deserialize;
use thiserror::Error;

/// Structural selector: an element with `tag` whose `attribute` has `value`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ElementSelector {
    pub tag: String,
    pub attribute: String,
    pub value: String,
}

impl ElementSelector {
    pub fn new(tag: &str, attribute: &str, value: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}={}]", self.tag, self.attribute, self.value)
    }
}

/// Why a page produced no storable content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Page has no heading element or it is empty")]
    MissingHeading,

    #[error("Page has no body element or it is empty")]
    MissingBody,

    #[error("Page is marked as having no content")]
    NoContentMarker,
}
