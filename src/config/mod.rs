//! Configuration module
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file (batch size, timeouts, selectors, exclusion rules).
//!
//! # Example
//!
//! ```no_run
//! use kosh_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ExclusionEntry, ExtractionConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
