//! Configuration files on disk

use adlib_harvest::config::{
    load_config_with_hash, validate_for_mode, ActiveStatus, AdType, RunMode,
};
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
[fetch]
timeout-secs = 10

[api]
access-token = "abc"
rate-limit-cooldown-secs = 30
polite-delay-ms = 500

[search]
search-terms = "shoes"
countries = ["IT", "FR"]
active-status = "ACTIVE"
ad-type = "POLITICAL_AND_ISSUE_ADS"
limit = 50
max-pages = 3

[crawl]
seeds = ["https://www.facebook.com/ads/library/?q=shoes"]
max-pages = 20
max-depth = 1

[output]
jsonl-path = "ads.jsonl"
"#,
    );

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(hash.len(), 64);
    assert_eq!(config.fetch.timeout_secs, 10);
    assert_eq!(config.search.countries, vec!["IT", "FR"]);
    assert_eq!(config.search.active_status, ActiveStatus::Active);
    assert_eq!(config.search.ad_type, AdType::PoliticalAndIssueAds);
    assert_eq!(config.crawl.max_depth, 1);
    assert_eq!(config.output.jsonl_path.as_deref(), Some("ads.jsonl"));
    assert!(config.output.database_path.is_none());

    assert!(validate_for_mode(&config, RunMode::Search).is_ok());
    assert!(validate_for_mode(&config, RunMode::Crawl).is_ok());
}

#[test]
fn test_same_content_same_hash() {
    let a = write_config("[search]\nlimit = 10\n");
    let b = write_config("[search]\nlimit = 10\n");
    let c = write_config("[search]\nlimit = 11\n");

    let (_, hash_a) = load_config_with_hash(a.path()).unwrap();
    let (_, hash_b) = load_config_with_hash(b.path()).unwrap();
    let (_, hash_c) = load_config_with_hash(c.path()).unwrap();
    assert_eq!(hash_a, hash_b);
    assert_ne!(hash_a, hash_c);
}

#[test]
fn test_search_without_token_is_rejected() {
    let file = write_config("[search]\nsearch-terms = \"shoes\"\n");
    let (config, _) = load_config_with_hash(file.path()).unwrap();
    assert!(validate_for_mode(&config, RunMode::Search).is_err());
    assert!(validate_for_mode(&config, RunMode::Crawl).is_err());
}

#[test]
fn test_invalid_limit_is_rejected() {
    let file = write_config("[search]\nlimit = 0\n");
    assert!(load_config_with_hash(file.path()).is_err());
}
