//! Heading/body extraction, text sanitizing and fingerprints

use crate::config::ExtractionConfig;
use crate::extract::{DocumentView, ElementSelector, ExtractError};
use crate::storage::FetchedContent;
use sha2::{Digest, Sha256};

/// Sanitized heading and body of a content page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub heading: String,
    pub body: String,
}

impl ExtractedContent {
    /// Builds the storable row for `url`, fingerprinting both fields
    pub fn into_record(self, url: &str) -> FetchedContent {
        FetchedContent {
            url: url.to_string(),
            heading_hash: fingerprint(&self.heading),
            body_hash: fingerprint(&self.body),
            heading: self.heading,
            body: self.body,
        }
    }
}

/// Collapses whitespace runs inside each line and drops blank lines
///
/// Line structure survives (poem bodies are line-oriented); everything else
/// about spacing does not. `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hex SHA-256 digest of `text`
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Extracts and sanitizes the heading and body selected from `doc`
///
/// # Returns
///
/// * `Ok(ExtractedContent)` - Both elements exist and are non-empty after
///   sanitizing
/// * `Err(ExtractError::MissingHeading)` / `Err(ExtractError::MissingBody)`
pub fn extract<D: DocumentView + ?Sized>(
    doc: &D,
    heading: &ElementSelector,
    body: &ElementSelector,
) -> Result<ExtractedContent, ExtractError> {
    let heading = select_text(doc, heading).ok_or(ExtractError::MissingHeading)?;
    let body = select_text(doc, body).ok_or(ExtractError::MissingBody)?;
    Ok(ExtractedContent { heading, body })
}

fn select_text<D: DocumentView + ?Sized>(doc: &D, selector: &ElementSelector) -> Option<String> {
    doc.find_by_attribute(selector)
        .map(|element| sanitize(&element.text))
        .filter(|text| !text.is_empty())
}

/// Page-level extractor configured with the three structural selectors
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    selectors: ExtractionConfig,
}

impl ContentExtractor {
    pub fn new(selectors: ExtractionConfig) -> Self {
        Self { selectors }
    }

    /// Extracts content, reporting an explicit "no content" page first
    pub fn extract_page<D: DocumentView + ?Sized>(
        &self,
        doc: &D,
    ) -> Result<ExtractedContent, ExtractError> {
        if doc.find_by_attribute(&self.selectors.no_content).is_some() {
            return Err(ExtractError::NoContentMarker);
        }
        extract(doc, &self.selectors.heading, &self.selectors.body)
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

/// Returns the raw hrefs worth following, in document order
///
/// Skips empty and fragment-only hrefs and anchors marked `download`.
pub fn harvest_links<D: DocumentView + ?Sized>(doc: &D) -> Vec<String> {
    doc.find_by_tag("a")
        .into_iter()
        .filter(|anchor| !anchor.has_attr("download"))
        .filter_map(|anchor| {
            let href = anchor.attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') {
                return None;
            }
            Some(href.to_string())
        })
        .collect()
}
