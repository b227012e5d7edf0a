//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client (user agent, timeout, redirect limit)
//! - GET requests with redirects followed by the client
//! - Classifying the outcome so the driver can record it

use crate::config::CrawlerConfig;
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::time::Duration;

/// Maximum redirect hops followed for one fetch
pub const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// 2xx response with a non-empty body
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// 2xx response whose body is empty or whitespace
    EmptyBody { final_url: String, status_code: u16 },

    /// Any non-2xx final status
    HttpError { status_code: u16 },

    /// The request did not complete within the configured timeout
    Timeout,

    /// Redirect loop or chain longer than [`MAX_REDIRECTS`]
    RedirectError { error: String },

    /// Connection refused, DNS failure, body decode error, ...
    NetworkError { error: String },
}

impl fmt::Display for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchResult::Success { status_code, .. } => write!(f, "HTTP {}", status_code),
            FetchResult::EmptyBody { status_code, .. } => {
                write!(f, "HTTP {} with empty body", status_code)
            }
            FetchResult::HttpError { status_code } => write!(f, "HTTP {}", status_code),
            FetchResult::Timeout => write!(f, "request timeout"),
            FetchResult::RedirectError { error } => write!(f, "redirect error: {}", error),
            FetchResult::NetworkError { error } => write!(f, "network error: {}", error),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use kosh_crawler::config::CrawlerConfig;
/// use kosh_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_millis(config.fetch_timeout_ms))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx, non-empty body | Success |
/// | 2xx, empty body | EmptyBody |
/// | any other final status | HttpError |
/// | timeout | Timeout |
/// | redirect loop / > 10 hops | RedirectError |
/// | anything else | NetworkError |
///
/// A redirect is visible to the caller as `final_url` differing from `url`.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    match response.text().await {
        Ok(body) if body.trim().is_empty() => FetchResult::EmptyBody {
            final_url,
            status_code: status.as_u16(),
        },
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => classify_error(&e),
    }
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::Timeout
    } else if e.is_redirect() {
        FetchResult::RedirectError {
            error: e.to_string(),
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: "Connection refused".to_string(),
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
        }
    }
}
