//! Per-candidate field miners
//!
//! Each miner is a pure function of one candidate block. Pattern miners are
//! ordered lists where the first match wins.

use super::candidates::{collapse_whitespace, element_text, CandidateBlock};
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;
const BODY_MIN_CHARS: usize = 20;
const BODY_MAX_CHARS: usize = 1000;

/// Sub-selectors tried for the advertiser name, in priority order
const NAME_SELECTORS: &[&str] = &[
    "[data-testid*='page-name']",
    "[class*='page-name']",
    "[class*='advertiser']",
    "h1, h2, h3, h4",
    "a[role='link'] span",
    "strong",
    "b",
];

/// Short card labels
///
/// A label matches the whole text, or opens it when followed by a separator
/// or a count (`Active: 3 days`, `Platforms 2`). "Active Life Gym" is a name.
const BOILERPLATE_LABELS: &[&str] = &[
    "sponsored",
    "active",
    "inactive",
    "platforms",
    "impressions",
    "see more",
    "see ad details",
    "see summary details",
    "ad library",
    "learn more",
    "shop now",
    "sign up",
    "this ad has multiple versions",
];

/// Phrases that introduce card metadata, whatever follows them
const BOILERPLATE_PHRASES: &[&str] = &[
    "library id",
    "ad id",
    "started running on",
    "paid for by",
    "amount spent",
];

const LABEL_SEPARATORS: &[char] = &[':', '\u{b7}', '\u{2022}', '|', '-'];

const BODY_SELECTORS: &[&str] = &["div", "p", "span"];

const START_DATE_PATTERNS: &[&str] = &[
    r"(?i)started running on\s+([A-Za-z]{3,9}\.?\s+\d{1,2},?\s+\d{4})",
    r"(?i)started running on\s+(\d{1,2}\s+[A-Za-z]{3,9}\.?,?\s+\d{4})",
    r"(?i)(?:start date|started|running since)[:\s]+(\d{4}-\d{2}-\d{2})",
    r"\b(\d{4}-\d{2}-\d{2})\b",
    r"\b(\d{1,2}/\d{1,2}/\d{4})\b",
];

const IMPRESSIONS_PATTERNS: &[&str] = &[
    r"(?i)impressions?[:\s]+([<>≥≤]?\s*[\d.,]+\s*[KMB]?(?:\s*[-–]\s*[\d.,]+\s*[KMB]?)?)",
    r"(?i)([\d.,]+\s*[KMB]?\s*[-–]\s*[\d.,]+\s*[KMB]?)\s+impressions",
    r"(?i)([<>]\s*[\d.,]+\s*[KMB]?)\s+impressions",
];

const SPEND_PATTERNS: &[&str] = &[
    r"(?i)(?:amount spent|spend|spent)[^:\d€$£]{0,20}[:\s]+((?:[€$£]|USD|EUR|GBP)?\s*[\d.,]+\s*[KMB]?(?:\s*[-–]\s*(?:[€$£])?\s*[\d.,]+\s*[KMB]?)?)",
    r"([€$£]\s*[\d.,]+\s*[KMB]?\s*[-–]\s*[€$£]\s*[\d.,]+\s*[KMB]?)",
    r"([<>]\s*[€$£]\s*[\d.,]+\s*[KMB]?)",
];

static NAME: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(NAME_SELECTORS));
static BODY: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(BODY_SELECTORS));
static LINK: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&["a[href]"]));

static START_DATE: LazyLock<Vec<Regex>> = LazyLock::new(|| regexes(START_DATE_PATTERNS));
static IMPRESSIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| regexes(IMPRESSIONS_PATTERNS));
static SPEND: LazyLock<Vec<Regex>> = LazyLock::new(|| regexes(SPEND_PATTERNS));

fn selectors(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .filter_map(|p| Selector::parse(p).ok())
        .collect()
}

fn regexes(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// Returns the first capture of the first pattern that matches
pub fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Returns true for card chrome that is neither a name nor ad copy
pub fn is_boilerplate(text: &str) -> bool {
    let lower = collapse_whitespace(text).to_lowercase();
    let lower = lower.trim_end_matches(['.', ':', '\u{2026}']).trim_end();

    let label = BOILERPLATE_LABELS.iter().any(|label| {
        lower.strip_prefix(label).is_some_and(|rest| {
            let rest = rest.trim_start();
            rest.is_empty()
                || rest.starts_with(LABEL_SEPARATORS)
                || rest.starts_with(|c: char| c.is_ascii_digit())
        })
    });

    label
        || BOILERPLATE_PHRASES.iter().any(|phrase| {
            lower
                .strip_prefix(phrase)
                .is_some_and(|rest| rest.is_empty() || !rest.starts_with(char::is_alphanumeric))
        })
}

fn acceptable_name(text: &str) -> bool {
    let len = text.chars().count();
    (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) && !is_boilerplate(text)
}

/// Advertiser name
///
/// Tries the name sub-selectors in order, then falls back to the first short
/// line of the block.
pub fn mine_name(block: &CandidateBlock<'_>) -> Option<String> {
    let by_selector = NAME.iter().find_map(|selector| {
        block
            .element
            .select(selector)
            .map(|e| element_text(&e))
            .find(|t| acceptable_name(t))
    });
    if by_selector.is_some() {
        return by_selector;
    }

    block
        .element
        .text()
        .map(collapse_whitespace)
        .find(|line| acceptable_name(line))
}

/// Longest boilerplate-free text block inside the candidate
///
/// The candidate itself never qualifies, and neither does an element that
/// wraps another qualifying block, so the innermost copy wins over a wrapper
/// holding the whole card.
pub fn mine_body(block: &CandidateBlock<'_>, name: Option<&str>) -> Option<String> {
    let container = block.element.id();

    let qualifying: Vec<(ElementRef<'_>, String)> = BODY
        .iter()
        .flat_map(|selector| block.element.select(selector))
        .filter(|element| element.id() != container)
        .filter_map(|element| {
            let text = element_text(&element);
            let len = text.chars().count();
            let usable = (BODY_MIN_CHARS..=BODY_MAX_CHARS).contains(&len)
                && Some(text.as_str()) != name
                && !is_boilerplate(&text);
            usable.then_some((element, text))
        })
        .collect();

    let ids: Vec<_> = qualifying.iter().map(|(element, _)| element.id()).collect();
    let wraps_another = |element: &ElementRef<'_>| {
        element
            .descendants()
            .any(|node| node.id() != element.id() && ids.contains(&node.id()))
    };

    let mut best: Option<&String> = None;
    for (element, text) in &qualifying {
        if wraps_another(element) {
            continue;
        }
        if best.map_or(true, |b| text.chars().count() > b.chars().count()) {
            best = Some(text);
        }
    }
    best.cloned()
}

/// Link to the ad's detail page in the library, made absolute
pub fn mine_detail_link(block: &CandidateBlock<'_>, base_url: &Url) -> Option<String> {
    LINK.iter()
        .flat_map(|s| block.element.select(s))
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            (href.contains("/ads/library") || href.contains("/ads/archive")) && href.contains("id=")
        })
        .find_map(|href| base_url.join(href.trim()).ok())
        .map(|url| url.to_string())
}

pub fn mine_start_date(text: &str) -> Option<String> {
    first_match(&START_DATE, text)
}

pub fn mine_impressions(text: &str) -> Option<String> {
    first_match(&IMPRESSIONS, text)
}

pub fn mine_spend(text: &str) -> Option<String> {
    first_match(&SPEND, text)
}
