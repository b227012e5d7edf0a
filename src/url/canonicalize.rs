use crate::UrlError;
use std::borrow::Cow;
use url::{ParseError, Url};

/// Normalizes raw hyperlinks into comparison-stable absolute URL strings
///
/// A `Canonicalizer` is bound to one base domain. Relative and path-only
/// links are resolved against the base's scheme and host; absolute links to
/// other hosts are kept as external absolute URLs.
///
/// # Normalization Steps
///
/// 1. Parse the URL, resolving relative input against the base root
/// 2. Drop the fragment (everything after #)
/// 3. Percent-decode the path and query until no escape remains, keeping
///    characters that would reparse differently escaped
/// 4. Normalize the path:
///    - Remove dot segments (. and ..)
///    - Remove trailing slashes (including the root slash)
/// 5. Drop an empty query string (trailing ?)
/// 6. Escape trailing spaces, which the parser would trim
///
/// Canonicalization never fails: input the URL parser rejects is trimmed of
/// its fragment and surrounding slashes and returned as-is. Query parameter
/// order is preserved, so `?a=1&b=2` and `?b=2&a=1` stay distinct.
///
/// # Examples
///
/// ```
/// use kosh_crawler::url::Canonicalizer;
///
/// let canon = Canonicalizer::new("http://ex.org/").unwrap();
/// assert_eq!(canon.canonicalize("/a/"), "http://ex.org/a");
/// assert_eq!(canon.canonicalize("http://EX.org/b#top"), "http://ex.org/b");
/// assert_eq!(canon.canonicalize("https://other.org/c/"), "https://other.org/c");
/// ```
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    /// Scheme, host and port of the base domain with an empty path
    root: Url,

    /// Canonical form of the base URL itself
    base: String,
}

impl Canonicalizer {
    /// Creates a canonicalizer for the given base domain URL
    ///
    /// # Returns
    ///
    /// * `Ok(Canonicalizer)` - The base has a scheme and a host
    /// * `Err(UrlError)` - The base is empty, unparseable, or has no host
    pub fn new(base_domain: &str) -> Result<Self, UrlError> {
        let trimmed = base_domain.trim();
        if trimmed.is_empty() {
            return Err(UrlError::Empty);
        }

        let parsed = Url::parse(trimmed).map_err(|e| UrlError::Parse(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| UrlError::Parse(format!("base URL has no host: {}", trimmed)))?;

        let root = Url::parse(&format!(
            "{}://{}/",
            parsed.scheme(),
            authority(host, parsed.port())
        ))
        .map_err(|e| UrlError::Parse(e.to_string()))?;

        let mut canonicalizer = Self {
            root,
            base: String::new(),
        };
        canonicalizer.base = canonicalizer.canonicalize(trimmed);
        Ok(canonicalizer)
    }

    /// Returns the canonical form of the base URL
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Returns the `host[:port]` of the base domain
    pub fn base_authority(&self) -> String {
        authority(self.root.host_str().unwrap_or_default(), self.root.port())
    }

    /// Canonicalizes a raw URL; total, pure and idempotent
    pub fn canonicalize(&self, raw: &str) -> String {
        // Trim only what the URL parser itself ignores
        let trimmed = raw.trim_matches(|c: char| c <= ' ');

        let parsed = match Url::parse(trimmed) {
            Err(ParseError::RelativeUrlWithoutBase) => self.root.join(trimmed),
            other => other,
        };

        match parsed {
            Ok(url) => serialize(&url),
            Err(e) => {
                tracing::trace!("Keeping unparseable URL {:?} verbatim: {}", trimmed, e);
                strip_fragment(trimmed).trim_matches('/').to_string()
            }
        }
    }

    /// Canonicalizes a URL, rejecting empty input
    ///
    /// Callers that take URLs from untrusted sources (hrefs, stored rows) use
    /// this instead of [`Canonicalizer::canonicalize`] so empty strings never
    /// silently become the base URL.
    pub fn try_canonicalize(&self, raw: &str) -> Result<String, UrlError> {
        if raw.trim().is_empty() {
            return Err(UrlError::Empty);
        }
        Ok(self.canonicalize(raw))
    }

    /// Returns true if the URL has no host or its host matches the base host
    ///
    /// The comparison includes the port and is case-sensitive on the
    /// normalized (lowercased) host.
    pub fn is_from_base_domain(&self, url: &str) -> bool {
        match Url::parse(url.trim()) {
            Err(ParseError::RelativeUrlWithoutBase) => true,
            Err(_) => false,
            Ok(parsed) => match parsed.host_str() {
                None => true,
                Some(host) => authority(host, parsed.port()) == self.base_authority(),
            },
        }
    }
}

/// Serializes a parsed URL in canonical form
fn serialize(url: &Url) -> String {
    let host = match url.host_str() {
        Some(host) if !url.cannot_be_a_base() => host,
        _ => {
            // mailto:, javascript: and friends carry no host to normalize
            let mut url = url.clone();
            url.set_fragment(None);
            return url.as_str().trim_end_matches('/').to_string();
        }
    };

    let mut out = format!("{}://{}", url.scheme(), authority(host, url.port()));
    out.push_str(&normalize_path(&decode_component(url.path(), Component::Path)));

    if let Some(query) = url.query() {
        let query = decode_component(query, Component::Query);
        if !query.is_empty() {
            out.push('?');
            out.push_str(&query);
        }
    }

    escape_trailing_spaces(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Path,
    Query,
}

/// Percent-decodes until the text is stable
///
/// Decoding to a fixed point makes double-encoded input (`%2520`) settle on
/// the same form as its single-encoded twin. Characters the URL parser would
/// read differently on the next pass stay encoded: `#` starts a fragment,
/// `?` in a path starts the query, `\` reads as `/`, and control characters
/// are stripped.
fn decode_component(component: &str, kind: Component) -> String {
    let mut current = component.to_string();
    loop {
        let decoded = urlencoding::decode_binary(current.as_bytes());
        let next = String::from_utf8_lossy(&decoded).into_owned();
        if next == current {
            break;
        }
        current = next;
    }

    let mut out = String::with_capacity(current.len());
    for c in current.chars() {
        match c {
            '#' | '\\' => push_escaped(&mut out, c),
            '?' if kind == Component::Path => push_escaped(&mut out, c),
            c if c.is_ascii_control() => push_escaped(&mut out, c),
            c => out.push(c),
        }
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    out.push_str(&format!("%{:02X}", c as u32));
}

fn escape_trailing_spaces(url: String) -> String {
    let kept = url.trim_end_matches(' ');
    let trailing = url.len() - kept.len();
    if trailing == 0 {
        return url;
    }
    format!("{}{}", kept, "%20".repeat(trailing))
}

/// Normalizes a URL path by removing dot segments and trailing slashes
///
/// Interior empty segments (`/a//b`) are kept. The root path normalizes to
/// the empty string.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/').skip(1) {
        match segment {
            "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    let joined = format!("/{}", segments.join("/"));
    joined.trim_end_matches('/').to_string()
}

fn strip_fragment(raw: &str) -> &str {
    raw.split('#').next().unwrap_or(raw)
}

fn authority(host: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Returns the path-and-query part of a canonical or relative URL
pub(crate) fn path_and_query(url: &str) -> Cow<'_, str> {
    match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            match rest.find('/') {
                Some(path_start) => Cow::Borrowed(&rest[path_start..]),
                None => match rest.find('?') {
                    Some(query_start) => Cow::Owned(format!("/{}", &rest[query_start..])),
                    None => Cow::Borrowed("/"),
                },
            }
        }
        None => Cow::Borrowed(url),
    }
}
