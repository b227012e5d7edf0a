use crate::config::types::{Config, CrawlerConfig, ExclusionEntry, ExtractionConfig};
use crate::extract::ElementSelector;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_extraction_config(&config.extraction)?;
    validate_exclusions(&config.exclude)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.fetch_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "fetch-timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the heading, body and no-content selectors
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    validate_selector("heading", &config.heading)?;
    validate_selector("body", &config.body)?;
    validate_selector("no-content", &config.no_content)?;
    Ok(())
}

fn validate_selector(name: &str, selector: &ElementSelector) -> Result<(), ConfigError> {
    if selector.tag.trim().is_empty()
        || selector.attribute.trim().is_empty()
        || selector.value.trim().is_empty()
    {
        return Err(ConfigError::InvalidSelector(format!(
            "{} selector needs a tag, an attribute and a value, got {:?}",
            name, selector
        )));
    }

    if !selector
        .tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::InvalidSelector(format!(
            "{} selector tag must be a plain element name, got '{}'",
            name, selector.tag
        )));
    }

    Ok(())
}

/// Validates `[[exclude]]` entries: exactly one non-empty pattern each
fn validate_exclusions(entries: &[ExclusionEntry]) -> Result<(), ConfigError> {
    for (index, entry) in entries.iter().enumerate() {
        if entry.pattern_count() != 1 {
            return Err(ConfigError::Validation(format!(
                "exclude entry {} must set exactly one of contains, prefix, path-prefix",
                index
            )));
        }

        let empty = [&entry.contains, &entry.prefix, &entry.path_prefix]
            .iter()
            .any(|field| field.as_deref().is_some_and(str::is_empty));
        if empty {
            return Err(ConfigError::Validation(format!(
                "exclude entry {} has an empty pattern",
                index
            )));
        }
    }

    Ok(())
}
