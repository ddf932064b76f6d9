//! Extraction pipeline
//!
//! Turns a raw document into zero or more [`Record`]s.
//!
//! - Structured bodies go through [`project_api_record`].
//! - Rendered pages go through candidate discovery, per-block field mining and
//!   a quality filter in [`extract_page`].
//!
//! Everything here is synchronous. A parsed [`scraper::Html`] is not `Send`, so
//! callers parse and mine in one step and never hold a document across an
//! `.await`.

mod candidates;
mod identity;
mod links;
mod miners;
mod structured;

pub use candidates::{
    collapse_whitespace, dedup_candidates, discover_candidates, CandidateBlock, Strategy,
    CANDIDATE_PREFIX_CHARS, TEXT_KEYWORDS,
};
pub use identity::{block_identity, derived_identity, DERIVED_ID_PREFIX};
pub use links::extract_links;
pub use miners::{
    first_match, mine_body, mine_detail_link, mine_impressions, mine_name, mine_spend,
    mine_start_date,
};
pub use structured::{project_api_record, ApiPage};

use crate::record::{Record, SourceTag};
use chrono::Utc;
use scraper::Html;
use tracing::debug;
use url::Url;

/// Records and links found on one rendered page
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub records: Vec<Record>,
    pub links: Vec<Url>,
    /// Candidate blocks examined, after dedup
    pub candidates: usize,
}

/// Parses a rendered page and extracts both records and followable links
pub fn extract_page(html: &str, page_url: &Url) -> PageExtraction {
    let document = Html::parse_document(html);
    let candidates = discover_candidates(&document);
    let candidate_count = candidates.len();

    let records: Vec<Record> = candidates
        .iter()
        .filter_map(|block| mine_block(block, page_url))
        .collect();

    debug!(
        "{}: {} candidates, {} records",
        page_url,
        candidate_count,
        records.len()
    );

    PageExtraction {
        records,
        links: extract_links(&document, page_url),
        candidates: candidate_count,
    }
}

/// Heuristic records of a rendered page
pub fn extract_html_records(html: &str, page_url: &Url) -> Vec<Record> {
    extract_page(html, page_url).records
}

/// Mines one candidate into a record
///
/// Returns `None` when the block has neither a name nor a body.
pub fn mine_block(block: &CandidateBlock<'_>, page_url: &Url) -> Option<Record> {
    let name = mine_name(block);
    let body = mine_body(block, name.as_deref());
    if name.is_none() && body.is_none() {
        return None;
    }

    let identity = block_identity(block);
    let mut record = Record::captured(identity.clone(), SourceTag::Heuristic, Utc::now());
    record.set("ad_id", identity);
    record.set_text("page_name", name.as_deref());
    record.set_text("ad_text", body.as_deref());
    record.set_text("ad_library_url", mine_detail_link(block, page_url).as_deref());
    record.set_text("start_date", mine_start_date(&block.text).as_deref());
    record.set_text("impressions", mine_impressions(&block.text).as_deref());
    record.set_text("spend", mine_spend(&block.text).as_deref());
    record.set("source_url", page_url.as_str());
    Some(record)
}
