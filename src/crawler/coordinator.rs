//! Run coordinator - wires configuration, controllers and sinks together
//!
//! A run goes through the same steps in either mode:
//! 1. Open the run on the sink
//! 2. Drive the pagination or traversal controller to completion
//! 3. Hand the admitted records to the sink in admission order
//! 4. Finalize the sink with a [`RunSummary`]
//!
//! Records are handed over even when the run was cancelled or stopped early.
//! A sink that fails mid-run is still finalized, with a failed summary.

use super::fetcher::{Fetcher, HttpFetcher};
use super::pagination::{
    PageRequest, PaginationController, PaginationSettings, SearchParams, StopReason,
};
use super::traversal::{TraversalController, TraversalSettings};
use crate::config::{Config, RunMode};
use crate::output::{RecordSink, RunStatus, RunSummary};
use crate::record::Record;
use crate::state::{PageOutcome, RunState};
use crate::HarvestError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

/// Main run coordinator
pub struct Coordinator<F = HttpFetcher> {
    config: Arc<Config>,
    config_hash: String,
    fetcher: Arc<F>,
}

impl Coordinator<HttpFetcher> {
    /// Creates a coordinator that fetches over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, stored with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - HTTP client built
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::with_fetcher(config, config_hash, fetcher))
    }
}

impl<F: Fetcher + 'static> Coordinator<F> {
    /// Creates a coordinator around any [`Fetcher`]
    pub fn with_fetcher(config: Config, config_hash: impl Into<String>, fetcher: F) -> Self {
        Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            fetcher: Arc::new(fetcher),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the controller for `mode`
    pub async fn run(
        &self,
        mode: RunMode,
        state: &RunState,
        sink: &mut dyn RecordSink,
    ) -> Result<RunSummary, HarvestError> {
        match mode {
            RunMode::Search => self.run_search(state, sink).await,
            RunMode::Crawl => self.run_crawl(state, sink).await,
        }
    }

    /// Pages through the structured API
    pub async fn run_search(
        &self,
        state: &RunState,
        sink: &mut dyn RecordSink,
    ) -> Result<RunSummary, HarvestError> {
        let endpoint = Url::parse(&self.config.api.endpoint)?;
        let params = SearchParams::from_config(&self.config);
        let first = PageRequest::first(params, self.config.search.limit);
        let settings = PaginationSettings::from_config(&self.config);

        info!(
            "Starting search run ({} page(s) max, {} per page)",
            settings.max_pages, self.config.search.limit
        );
        sink.begin_run(RunMode::Search, &self.config_hash)?;

        let controller = PaginationController::new(self.fetcher.clone(), endpoint, settings);
        let report = controller.run(first, state).await;

        let mut summary = RunSummary::new(RunMode::Search, &self.config_hash);
        summary.units = report.rounds as u64;
        summary.rate_limit_hits = report.rate_limit_hits as u64;
        summary.duplicates_dropped = report.duplicates as u64;
        summary.outcomes = widen_counts(&report.outcomes);

        self.complete(sink, &report.records, summary, &report.stop_reason)
    }

    /// Crawls the configured seeds
    pub async fn run_crawl(
        &self,
        state: &RunState,
        sink: &mut dyn RecordSink,
    ) -> Result<RunSummary, HarvestError> {
        let seeds = self
            .config
            .crawl
            .seeds
            .iter()
            .map(|s| Url::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let settings = TraversalSettings::from_config(&self.config);

        info!(
            "Starting crawl run ({} seed(s), depth {}, budget {})",
            seeds.len(),
            settings.max_depth,
            settings.max_results
        );
        sink.begin_run(RunMode::Crawl, &self.config_hash)?;

        let controller = TraversalController::new(self.fetcher.clone(), settings);
        let report = controller.run(seeds, state).await;

        let mut summary = RunSummary::new(RunMode::Crawl, &self.config_hash);
        summary.units = report.pages_fetched as u64;
        summary.rate_limit_hits = report
            .outcomes
            .get(&PageOutcome::RateLimited)
            .copied()
            .unwrap_or(0) as u64;
        summary.duplicates_dropped = report.duplicates as u64;
        summary.outcomes = widen_counts(&report.outcomes);

        if report.frontier_remaining > 0 {
            info!("{} URL(s) left in the frontier", report.frontier_remaining);
        }

        self.complete(sink, &report.records, summary, &report.stop_reason)
    }

    fn complete(
        &self,
        sink: &mut dyn RecordSink,
        records: &[Record],
        mut summary: RunSummary,
        reason: &StopReason,
    ) -> Result<RunSummary, HarvestError> {
        for (written, record) in records.iter().enumerate() {
            if let Err(e) = sink.write_record(record) {
                summary.records_emitted = written as u64;
                summary.finish(RunStatus::Failed, format!("output failed: {}", e));
                if let Err(finalize_err) = sink.finalize(&summary) {
                    warn!("Failed to finalize output: {}", finalize_err);
                }
                error!("Run failed after {} record(s): {}", written, e);
                return Err(e.into());
            }
        }
        summary.records_emitted = records.len() as u64;
        summary.finish(status_for(reason), reason.to_string());
        sink.finalize(&summary)?;

        info!(
            "Run finished: {} record(s), stopped: {}",
            summary.records_emitted, summary.stop_reason
        );
        Ok(summary)
    }
}

fn status_for(reason: &StopReason) -> RunStatus {
    match reason {
        StopReason::Exhausted | StopReason::PageBudget => RunStatus::Completed,
        StopReason::Cancelled => RunStatus::Interrupted,
        StopReason::Failed(_) => RunStatus::Failed,
    }
}

fn widen_counts(counts: &BTreeMap<PageOutcome, usize>) -> BTreeMap<PageOutcome, u64> {
    counts.iter().map(|(k, v)| (*k, *v as u64)).collect()
}
