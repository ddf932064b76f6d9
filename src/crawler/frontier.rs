//! Crawl frontier
//!
//! A FIFO queue of `(url, depth)` entries. Popping and the visited
//! check-and-mark happen together, so a URL is handed out at most once per run
//! no matter how many workers are fetching.

use crate::state::VisitedSet;
use crate::url::{extract_domain, host_allowed};
use std::collections::VecDeque;
use tracing::trace;
use url::Url;

/// A URL queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    /// Link distance from the nearest seed
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: Url, depth: u32) -> Self {
        Self { url, depth }
    }
}

/// Breadth-first frontier with depth and domain policy
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    max_depth: u32,
    allowed_domains: Vec<String>,
    skipped_visited: usize,
}

impl Frontier {
    pub fn new(max_depth: u32, allowed_domains: Vec<String>) -> Self {
        Self {
            queue: VecDeque::new(),
            max_depth,
            allowed_domains,
            skipped_visited: 0,
        }
    }

    /// Seeds are queued at depth 0 and bypass the allow-list
    pub fn seed(&mut self, seeds: impl IntoIterator<Item = Url>) {
        self.queue
            .extend(seeds.into_iter().map(|url| FrontierEntry::new(url, 0)));
    }

    /// Pops the next unvisited entry and marks it visited
    ///
    /// Already-visited entries are discarded on the way.
    pub fn pop_unvisited(&mut self, visited: &VisitedSet) -> Option<FrontierEntry> {
        while let Some(entry) = self.queue.pop_front() {
            if visited.mark_if_new(&entry.url) {
                return Some(entry);
            }
            trace!("Already visited: {}", entry.url);
            self.skipped_visited += 1;
        }
        None
    }

    /// Queues the links of a page fetched at `parent_depth`
    ///
    /// # Admission
    ///
    /// - child depth (`parent_depth + 1`) below `max_depth`
    /// - URL not yet visited
    /// - host contains an allow-listed substring, when a list is configured
    ///
    /// Returns the number of links queued.
    pub fn expand(&mut self, links: Vec<Url>, parent_depth: u32, visited: &VisitedSet) -> usize {
        let depth = parent_depth + 1;
        if depth >= self.max_depth {
            return 0;
        }

        let before = self.queue.len();
        for link in links {
            if visited.contains(&link) {
                continue;
            }
            let host = extract_domain(&link).unwrap_or_default();
            if !host_allowed(&host, &self.allowed_domains) {
                trace!("Outside allowed domains: {}", link);
                continue;
            }
            self.queue.push_back(FrontierEntry::new(link, depth));
        }
        self.queue.len() - before
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Entries dropped because their URL was already visited
    pub fn skipped_visited(&self) -> usize {
        self.skipped_visited
    }
}
