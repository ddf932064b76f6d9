//! Configuration module for Adlib-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use adlib_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawl will use max depth: {}", config.crawl.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ActiveStatus, AdType, ApiConfig, Config, CrawlConfig, FetchConfig, OutputConfig, RunMode,
    SearchConfig, DEFAULT_API_ENDPOINT, DEFAULT_API_FIELDS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate_for_mode;
