//! Link extraction for frontier expansion
//!
//! **Include:**
//! - `<a href="...">` anywhere in the document
//! - `<link rel="canonical" href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` and `data:` links
//! - Fragment-only links
//! - Anything that does not resolve to http(s)

use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static ANCHOR: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("a[href]").ok());
static CANONICAL: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("link[rel='canonical'][href]").ok());

/// Extracts followable links in document order, without duplicates
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    if let Some(selector) = ANCHOR.as_ref() {
        for element in document.select(selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
                if seen.insert(url.to_string()) {
                    links.push(url);
                }
            }
        }
    }

    if let Some(selector) = CANONICAL.as_ref() {
        for element in document.select(selector) {
            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
                if seen.insert(url.to_string()) {
                    links.push(url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then_some(absolute)
}
