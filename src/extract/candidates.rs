//! Candidate block discovery
//!
//! Listing markup changes without notice, so several independent strategies
//! each propose regions that might hold one ad. Their results are merged in
//! strategy order and deduplicated by a text prefix before any field mining.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Number of leading characters that identify a candidate
pub const CANDIDATE_PREFIX_CHARS: usize = 100;

/// Text length bounds for full-scan fallback blocks
const FALLBACK_MIN_CHARS: usize = 50;
const FALLBACK_MAX_CHARS: usize = 3000;

/// How far a text keyword match may be widened, and how large the result may get
const WIDEN_LEVELS: usize = 4;
const WIDEN_MAX_CHARS: usize = 3000;

const ATTRIBUTE_SELECTORS: &[&str] = &[
    "[data-ad-id]",
    "[data-adid]",
    "[data-ad-archive-id]",
    "[data-testid*='ad-card']",
    "[data-testid*='ad_card']",
    "[data-testid*='ad-archive']",
];

const SEMANTIC_SELECTORS: &[&str] = &["article", "[role='article']"];

const CLASS_KEYWORDS: &[&str] = &[
    "ad-card",
    "adcard",
    "ad-container",
    "ad_container",
    "ad-item",
    "ad-result",
    "ad-library",
    "sponsored",
];

/// Phrases the ad library prints inside every ad card
pub const TEXT_KEYWORDS: &[&str] = &[
    "Library ID",
    "Started running on",
    "Sponsored",
    "Paid for by",
    "Ad ID",
];

static ATTRIBUTE: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(ATTRIBUTE_SELECTORS));
static SEMANTIC: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(SEMANTIC_SELECTORS));
// A keyword must open a class token, so `head-container` is not `ad-container`
static CLASS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    let patterns: Vec<String> = CLASS_KEYWORDS
        .iter()
        .map(|k| format!("[class^='{k}'], [class*=' {k}']"))
        .collect();
    patterns
        .iter()
        .filter_map(|p| Selector::parse(p).ok())
        .collect()
});
static DIV: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["div"]));

fn compile(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .filter_map(|p| Selector::parse(p).ok())
        .collect()
}

/// Which strategy proposed a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Attribute,
    Semantic,
    ClassKeyword,
    TextKeyword,
    Fallback,
}

/// A document region hypothesized to hold one record
#[derive(Debug, Clone)]
pub struct CandidateBlock<'a> {
    pub element: ElementRef<'a>,
    /// Whitespace-collapsed text content
    pub text: String,
    pub strategy: Strategy,
}

impl<'a> CandidateBlock<'a> {
    pub fn new(element: ElementRef<'a>, strategy: Strategy) -> Self {
        Self {
            text: element_text(&element),
            element,
            strategy,
        }
    }

    /// The dedup key: the first [`CANDIDATE_PREFIX_CHARS`] characters of text
    pub fn prefix(&self) -> &str {
        text_prefix(&self.text, CANDIDATE_PREFIX_CHARS)
    }
}

/// Finds candidate blocks in a document
///
/// The full-scan fallback only runs when every other strategy found nothing.
pub fn discover_candidates(document: &Html) -> Vec<CandidateBlock<'_>> {
    let mut found = Vec::new();
    found.extend(by_selectors(document, &ATTRIBUTE, Strategy::Attribute));
    found.extend(by_selectors(document, &SEMANTIC, Strategy::Semantic));
    found.extend(by_selectors(document, &CLASS, Strategy::ClassKeyword));
    found.extend(by_text_keywords(document));

    if found.is_empty() {
        found = fallback_blocks(document);
        debug!("No targeted candidates; fallback found {}", found.len());
    }

    dedup_candidates(found)
}

/// Keeps the first block for every distinct text prefix
///
/// Blocks with no text are dropped.
pub fn dedup_candidates(blocks: Vec<CandidateBlock<'_>>) -> Vec<CandidateBlock<'_>> {
    let mut seen = HashSet::new();
    blocks
        .into_iter()
        .filter(|b| !b.text.is_empty())
        .filter(|b| seen.insert(b.prefix().to_string()))
        .collect()
}

fn by_selectors<'a>(
    document: &'a Html,
    selectors: &[Selector],
    strategy: Strategy,
) -> Vec<CandidateBlock<'a>> {
    selectors
        .iter()
        .flat_map(|s| document.select(s))
        .map(|e| CandidateBlock::new(e, strategy))
        .collect()
}

fn by_text_keywords(document: &Html) -> Vec<CandidateBlock<'_>> {
    let mut blocks = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let Some(keyword) = TEXT_KEYWORDS.iter().find(|k| text.contains(*k)) else {
            continue;
        };
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if let Some(block) = widen(parent, keyword) {
            blocks.push(CandidateBlock::new(block, Strategy::TextKeyword));
        }
    }
    blocks
}

/// Walks up from a keyword match to the enclosing card
///
/// Climbs while the ancestor stays within the size bound and holds the keyword
/// only once. A second occurrence means the ancestor is a list of cards.
fn widen<'a>(start: ElementRef<'a>, keyword: &str) -> Option<ElementRef<'a>> {
    if is_page_level(&start) {
        return None;
    }
    let mut block = start;
    for _ in 0..WIDEN_LEVELS {
        match block.parent().and_then(ElementRef::wrap) {
            Some(parent)
                if !is_page_level(&parent)
                    && text_len(&parent) <= WIDEN_MAX_CHARS
                    && element_text(&parent).matches(keyword).count() <= 1 =>
            {
                block = parent
            }
            _ => break,
        }
    }
    Some(block)
}

fn fallback_blocks(document: &Html) -> Vec<CandidateBlock<'_>> {
    by_selectors(document, &DIV, Strategy::Fallback)
        .into_iter()
        .filter(|b| {
            let len = b.text.chars().count();
            (FALLBACK_MIN_CHARS..=FALLBACK_MAX_CHARS).contains(&len)
        })
        .collect()
}

fn is_page_level(element: &ElementRef<'_>) -> bool {
    matches!(element.value().name(), "html" | "body" | "head")
}

/// Text content with runs of whitespace collapsed to one space
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_len(element: &ElementRef<'_>) -> usize {
    element.text().map(|t| t.trim().chars().count()).sum()
}

/// The first `max_chars` characters of `text`
pub fn text_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
