use crate::config::types::{ApiConfig, Config, CrawlConfig, FetchConfig, RunMode, SearchConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_api_config(&config.api)?;
    validate_search_config(&config.search)?;
    validate_crawl_config(&config.crawl)?;
    Ok(())
}

/// Validates the parts of the configuration a specific run mode needs
///
/// Search runs need an access token; crawl runs need at least one seed.
pub fn validate_for_mode(config: &Config, mode: RunMode) -> Result<(), ConfigError> {
    match mode {
        RunMode::Search => {
            let has_token = config
                .api
                .access_token
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty());
            if !has_token {
                return Err(ConfigError::Validation(
                    "access-token is required for search mode".to_string(),
                ));
            }
        }
        RunMode::Crawl => {
            if config.crawl.seeds.is_empty() {
                return Err(ConfigError::Validation(
                    "crawl mode requires at least one seed URL".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.endpoint, "endpoint")?;

    if config.fields.is_empty() {
        return Err(ConfigError::Validation(
            "fields must list at least one field".to_string(),
        ));
    }

    if config.fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "fields cannot contain empty names".to_string(),
        ));
    }

    // The courtesy pause must stay below the rate-limit cooldown
    if config.polite_delay_ms >= config.rate_limit_cooldown_secs.saturating_mul(1000) {
        return Err(ConfigError::Validation(format!(
            "polite_delay_ms ({}ms) must be smaller than rate_limit_cooldown_secs ({}s)",
            config.polite_delay_ms, config.rate_limit_cooldown_secs
        )));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.limit < 1 || config.limit > 1000 {
        return Err(ConfigError::Validation(format!(
            "limit must be between 1 and 1000, got {}",
            config.limit
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "search max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.countries.is_empty() {
        return Err(ConfigError::Validation(
            "countries must list at least one country code".to_string(),
        ));
    }

    for country in &config.countries {
        validate_country_code(country)?;
    }

    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "crawl max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be >= 1, got {}",
            config.max_depth
        )));
    }

    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    for seed in &config.seeds {
        validate_http_url(seed, "seed")?;
    }

    if config.allowed_domains.iter().any(|d| d.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "allowed_domains cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Two ASCII uppercase letters
fn validate_country_code(code: &str) -> Result<(), ConfigError> {
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "Invalid country code '{}': expected two uppercase letters",
            code
        )));
    }
    Ok(())
}

fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}
