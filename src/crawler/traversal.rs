//! Breadth-limited crawl traversal
//!
//! Pages are fetched by a bounded set of worker tasks. The orchestrating loop
//! owns the frontier, so frontier pops, visited marking and record admission
//! all happen in one place while fetches run in parallel.

use super::fetcher::{FetchFailure, FetchOutcome, FetchRequest, Fetcher};
use super::frontier::{Frontier, FrontierEntry};
use super::pagination::StopReason;
use crate::config::Config;
use crate::extract::{extract_page, PageExtraction};
use crate::record::Record;
use crate::state::{PageOutcome, RunState};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// Policy of a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalSettings {
    /// Result budget: the crawl stops once this many records were admitted
    pub max_results: usize,
    /// Depth limit; 1 means single-page mode
    pub max_depth: u32,
    pub allowed_domains: Vec<String>,
    /// Pages fetched at once
    pub concurrency: usize,
}

impl TraversalSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_results: config.crawl.max_pages as usize,
            max_depth: config.crawl.max_depth,
            allowed_domains: config.crawl.allowed_domains.clone(),
            concurrency: config.crawl.concurrency.max(1) as usize,
        }
    }

    pub fn is_single_page(&self) -> bool {
        self.max_depth <= 1
    }
}

/// What a crawl run produced
#[derive(Debug)]
pub struct TraversalReport {
    /// Admitted records in admission order
    pub records: Vec<Record>,
    pub pages_fetched: usize,
    pub duplicates: usize,
    pub outcomes: BTreeMap<PageOutcome, usize>,
    pub stop_reason: StopReason,
    /// Entries still queued when the run ended
    pub frontier_remaining: usize,
}

impl TraversalReport {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            pages_fetched: 0,
            duplicates: 0,
            outcomes: BTreeMap::new(),
            stop_reason: StopReason::Exhausted,
            frontier_remaining: 0,
        }
    }

    fn count(&mut self, outcome: PageOutcome) {
        *self.outcomes.entry(outcome).or_default() += 1;
    }

    fn count_skipped(&mut self, skipped: usize) {
        if skipped > 0 {
            *self.outcomes.entry(PageOutcome::AlreadyVisited).or_default() += skipped;
        }
    }
}

/// Result of one worker task
struct PageResult {
    entry: FrontierEntry,
    outcome: Result<PageExtraction, PageOutcome>,
}

/// Drives the crawl
pub struct TraversalController<F> {
    fetcher: Arc<F>,
    settings: TraversalSettings,
}

impl<F: Fetcher + 'static> TraversalController<F> {
    pub fn new(fetcher: Arc<F>, settings: TraversalSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn settings(&self) -> &TraversalSettings {
        &self.settings
    }

    /// Crawls from `seeds` until the frontier drains or a stop condition fires
    ///
    /// Stop conditions are the result budget and cancellation. Either way the
    /// records admitted so far are returned.
    pub async fn run(&self, seeds: Vec<Url>, state: &RunState) -> TraversalReport {
        let mut report = TraversalReport::new();
        let mut frontier = Frontier::new(
            self.settings.max_depth,
            self.settings.allowed_domains.clone(),
        );
        frontier.seed(seeds);

        if self.settings.is_single_page() {
            info!("Single-page mode: {} seed(s), no link expansion", frontier.len());
        }

        if self.settings.max_results == 0 {
            report.stop_reason = StopReason::PageBudget;
            report.frontier_remaining = frontier.len();
            return report;
        }

        let mut workers: JoinSet<PageResult> = JoinSet::new();
        let concurrency = self.settings.concurrency.max(1);

        loop {
            if state.is_cancelled() {
                workers.abort_all();
                report.stop_reason = StopReason::Cancelled;
                break;
            }

            // Top up in-flight fetches
            while workers.len() < concurrency {
                let Some(entry) = frontier.pop_unvisited(&state.visited) else {
                    break;
                };
                debug!("Fetching {} (depth {})", entry.url, entry.depth);
                let fetcher = Arc::clone(&self.fetcher);
                workers.spawn(async move { process_page(fetcher.as_ref(), entry).await });
            }

            if workers.is_empty() {
                break;
            }

            let joined = tokio::select! {
                biased;
                _ = state.cancel.cancelled() => {
                    workers.abort_all();
                    report.stop_reason = StopReason::Cancelled;
                    break;
                }
                joined = workers.join_next() => joined,
            };

            let result = match joined {
                Some(Ok(result)) => result,
                Some(Err(e)) => {
                    warn!("Page task failed: {}", e);
                    continue;
                }
                None => break,
            };

            report.pages_fetched += 1;
            let page = match result.outcome {
                Ok(page) => page,
                Err(outcome) => {
                    report.count(outcome);
                    continue;
                }
            };

            report.count(if page.records.is_empty() {
                PageOutcome::Empty
            } else {
                PageOutcome::Extracted
            });

            let mut admitted = 0;
            for record in page.records {
                if report.records.len() >= self.settings.max_results {
                    break;
                }
                if state.seen.admit(&record) {
                    report.records.push(record);
                    admitted += 1;
                } else {
                    report.duplicates += 1;
                }
            }

            let queued = frontier.expand(page.links, result.entry.depth, &state.visited);
            info!(
                "{}: {} new record(s), {} link(s) queued, {} total",
                result.entry.url,
                admitted,
                queued,
                report.records.len()
            );

            if report.records.len() >= self.settings.max_results {
                info!("Result budget of {} reached", self.settings.max_results);
                workers.abort_all();
                report.stop_reason = StopReason::PageBudget;
                break;
            }
        }

        report.count_skipped(frontier.skipped_visited());
        report.frontier_remaining = frontier.len();
        report
    }
}

/// Fetches and extracts one page
///
/// Parsing happens after the last await, so no document is held across a
/// suspension point.
async fn process_page<F: Fetcher + ?Sized>(fetcher: &F, entry: FrontierEntry) -> PageResult {
    let outcome = fetcher.fetch(&FetchRequest::html(entry.url.clone())).await;

    let outcome = match outcome {
        FetchOutcome::Success {
            body, final_url, ..
        } => Ok(extract_page(&body, &final_url)),
        FetchOutcome::RateLimited { .. } => {
            warn!("{}: rate limited, page skipped", entry.url);
            Err(PageOutcome::RateLimited)
        }
        FetchOutcome::TransientError { cause } => {
            warn!("{}: {}", entry.url, cause);
            Err(PageOutcome::TransientError)
        }
        FetchOutcome::FatalError {
            cause: FetchFailure::UnsupportedContent(content_type),
        } => {
            debug!("{}: not HTML ({})", entry.url, content_type);
            Err(PageOutcome::ContentMismatch)
        }
        FetchOutcome::FatalError { cause } => {
            warn!("{}: {}", entry.url, cause);
            Err(PageOutcome::FatalError)
        }
    };

    PageResult { entry, outcome }
}
