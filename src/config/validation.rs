use crate::config::types::{
    Config, ExtractorConfig, HarvestConfig, HttpConfig, OutputConfig, RetryConfig,
};
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_harvest_config(&config.harvest)?;
    validate_http_config(&config.http)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;
    validate_extractor_config(&config.extractor)?;
    Ok(())
}

fn validate_harvest_config(config: &HarvestConfig) -> ConfigResult<()> {
    if config.sitemaps.is_empty() {
        return Err(ConfigError::Validation(
            "at least one sitemap URL is required".to_string(),
        ));
    }

    for sitemap in &config.sitemaps {
        validate_http_url(sitemap)?;
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > MAX_CONCURRENT_REQUESTS
    {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and {}, got {}",
            MAX_CONCURRENT_REQUESTS, config.max_concurrent_requests
        )));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> ConfigResult<()> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.export_path.is_empty() {
        return Err(ConfigError::Validation(
            "export-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_extractor_config(config: &ExtractorConfig) -> ConfigResult<()> {
    validate_selector(&config.article_row_selector)?;
    validate_selector(&config.compatibility_row_selector)?;

    if config.part_no_label.trim().is_empty() {
        return Err(ConfigError::Validation(
            "part-no-label cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> ConfigResult<()> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {}", selector, e)))
}

/// Sitemaps must be absolute http(s) URLs
fn validate_http_url(raw: &str) -> ConfigResult<()> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid sitemap URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Sitemap URL '{}' must use http or https",
            raw
        )));
    }

    Ok(())
}
