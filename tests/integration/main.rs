//! Integration tests for Adlib-Harvest
//!
//! These tests use wiremock to stand in for the archive API and for listing
//! pages, and drive full runs end-to-end through the public API.

mod config_tests;
mod crawl_tests;
mod fetch_tests;
mod search_tests;

use adlib_harvest::config::Config;

/// A configuration with no waits, suitable for mock servers
pub fn fast_config(server_uri: &str) -> Config {
    let mut config = Config::default();
    config.fetch.timeout_secs = 5;
    config.api.endpoint = format!("{}/ads_archive", server_uri);
    config.api.access_token = Some("test-token".to_string());
    config.api.rate_limit_cooldown_secs = 0;
    config.api.polite_delay_ms = 0;
    config
}
