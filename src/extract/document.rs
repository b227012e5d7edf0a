//! Read-only document capability used by the extractor
//!
//! The extractor and link harvester only ever ask two questions of a page:
//! "which elements have this tag" and "which element has this tag and
//! attribute value". [`DocumentView`] exposes exactly that, returning owned
//! [`ElementView`]s so callers never hold parser internals.

use crate::extract::ElementSelector;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose start begins a new text line
const LINE_BREAKING: &[&str] = &[
    "br", "p", "div", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// An owned snapshot of one element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementView {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    /// Text content with `<br>` and block starts rendered as line breaks
    pub text: String,
}

impl ElementView {
    /// Returns the value of an attribute, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

/// Narrow query interface over a parsed page
pub trait DocumentView {
    /// All elements with the given tag, in document order
    fn find_by_tag(&self, tag: &str) -> Vec<ElementView>;

    /// The first element matching `selector`
    ///
    /// For the `class` attribute the value matches any one class token;
    /// other attributes must match exactly.
    fn find_by_attribute(&self, selector: &ElementSelector) -> Option<ElementView>;
}

/// [`DocumentView`] backed by a `scraper` HTML tree
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parses a full HTML document; malformed markup is recovered, never an error
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    fn select_tag(&self, tag: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(tag) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(_) => {
                tracing::warn!("Ignoring unusable tag selector: {}", tag);
                Vec::new()
            }
        }
    }
}

impl DocumentView for HtmlDocument {
    fn find_by_tag(&self, tag: &str) -> Vec<ElementView> {
        self.select_tag(tag).into_iter().map(snapshot).collect()
    }

    fn find_by_attribute(&self, selector: &ElementSelector) -> Option<ElementView> {
        self.select_tag(&selector.tag)
            .into_iter()
            .find(|element| {
                let Some(actual) = element.value().attr(&selector.attribute) else {
                    return false;
                };
                if selector.attribute == "class" {
                    actual
                        .split_ascii_whitespace()
                        .any(|token| token == selector.value)
                } else {
                    actual == selector.value
                }
            })
            .map(snapshot)
    }
}

fn snapshot(element: ElementRef<'_>) -> ElementView {
    ElementView {
        tag: element.value().name().to_string(),
        attributes: element
            .value()
            .attrs()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        text: element_text(element),
    }
}

/// Collects the text under `element`, turning line-breaking elements into '\n'
fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();

    for node in element.descendants().skip(1) {
        match node.value() {
            Node::Text(fragment) => text.push_str(fragment),
            Node::Element(inner) if LINE_BREAKING.contains(&inner.name()) => text.push('\n'),
            _ => {}
        }
    }

    text
}
