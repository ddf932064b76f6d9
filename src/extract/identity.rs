//! Record identity for mined blocks
//!
//! An explicit id attribute wins. Otherwise the library id printed on the card
//! is used, and as a last resort a hash of the block's leading text.

use super::candidates::{text_prefix, CandidateBlock, CANDIDATE_PREFIX_CHARS};
use regex::Regex;
use scraper::Selector;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Prefix of identities derived from text
pub const DERIVED_ID_PREFIX: &str = "heuristic_";

/// Size of the numeric space derived identities are reduced into
const DERIVED_ID_SPACE: u64 = 100_000_000;

/// Attributes holding an explicit identity, in priority order
const ID_ATTRIBUTES: &[&str] = &["data-ad-id", "data-adid", "data-ad-archive-id", "data-id", "id"];

/// Attributes specific enough to trust on a descendant of the block
const NESTED_ID_ATTRIBUTES: &[&str] = &["data-ad-id", "data-adid", "data-ad-archive-id"];

static NESTED_ID: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("[data-ad-id], [data-adid], [data-ad-archive-id]").ok());

static LIBRARY_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)library id[:\s#]+(\d{6,})").ok());

/// Identity of a candidate block
pub fn block_identity(block: &CandidateBlock<'_>) -> String {
    attribute_identity(block)
        .or_else(|| library_id(&block.text))
        .unwrap_or_else(|| derived_identity(&block.text))
}

/// Explicit id attribute on the block, or on a descendant for ad-specific attributes
pub fn attribute_identity(block: &CandidateBlock<'_>) -> Option<String> {
    let own = ID_ATTRIBUTES
        .iter()
        .filter_map(|attr| block.element.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty());
    if let Some(id) = own {
        return Some(id.to_string());
    }

    let selector = NESTED_ID.as_ref()?;
    block.element.select(selector).find_map(|e| {
        NESTED_ID_ATTRIBUTES
            .iter()
            .filter_map(|attr| e.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// The "Library ID" number printed on a card
pub fn library_id(text: &str) -> Option<String> {
    LIBRARY_ID
        .as_ref()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Identity derived from the leading text of a block
///
/// Stable for identical text within and across runs. Collisions are possible
/// and accepted: the second record is treated as a duplicate.
pub fn derived_identity(text: &str) -> String {
    hashed_identity(text_prefix(text, CANDIDATE_PREFIX_CHARS))
}

/// Identity derived from the whole of `content`
pub fn hashed_identity(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    format!(
        "{}{}",
        DERIVED_ID_PREFIX,
        u64::from_be_bytes(head) % DERIVED_ID_SPACE
    )
}
