//! URL handling module for Adlib-Harvest
//!
//! This module provides visit-key normalization, host extraction and the
//! allow-list check applied to links discovered during a crawl.

mod domain;
mod matcher;
mod normalize;

pub use domain::extract_domain;
pub use matcher::host_allowed;
pub use normalize::normalize_url;
