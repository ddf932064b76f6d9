//! Cursor-based pagination controller
//!
//! Drives the structured API one round at a time:
//!
//! | State | Event | Next |
//! |-------|-------|------|
//! | Fetching | success | Processing |
//! | Fetching | rate limited | Backoff |
//! | Fetching | transient or fatal error | Stopped |
//! | Backoff | cooldown elapsed | Fetching (same request) |
//! | Processing | empty page, no token, bad token | Exhausted |
//! | Processing | token and budget left | Fetching (advanced request) |
//! | Processing | page budget reached | Stopped |
//!
//! Rounds are strictly sequential. Cancellation is honoured at every
//! suspension point and returns what was collected so far.

use super::fetcher::{FetchOutcome, FetchRequest, Fetcher};
use crate::config::{ActiveStatus, AdType, Config};
use crate::extract::{project_api_record, ApiPage};
use crate::record::Record;
use crate::state::{PageOutcome, RunState};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Where the controller is in its round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Fetching,
    Processing,
    Backoff,
    Exhausted,
    Stopped,
}

/// Why a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// No more results, or no usable continuation token
    Exhausted,
    /// The page budget was used up
    PageBudget,
    Cancelled,
    /// A round or the last page failed
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => f.write_str("exhausted"),
            Self::PageBudget => f.write_str("page budget reached"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Failed(cause) => write!(f, "failed: {}", cause),
        }
    }
}

/// Search and filter parameters shared by every round
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub access_token: String,
    pub fields: Vec<String>,
    pub search_terms: Option<String>,
    pub countries: Vec<String>,
    pub active_status: ActiveStatus,
    pub ad_type: AdType,
}

impl SearchParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_token: config.api.access_token.clone().unwrap_or_default(),
            fields: config.api.fields.clone(),
            search_terms: config
                .search
                .search_terms
                .clone()
                .filter(|t| !t.trim().is_empty()),
            countries: config.search.countries.clone(),
            active_status: config.search.active_status,
            ad_type: config.search.ad_type,
        }
    }
}

/// The parameters of one round
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub params: SearchParams,
    pub limit: u32,
    /// Continuation token; `None` on the first page
    pub after: Option<String>,
}

impl PageRequest {
    pub fn first(params: SearchParams, limit: u32) -> Self {
        Self {
            params,
            limit,
            after: None,
        }
    }

    /// The request for the page after this one
    pub fn advance(&self, token: String) -> Self {
        Self {
            after: Some(token),
            ..self.clone()
        }
    }

    /// Query parameters in the order the API documents them
    pub fn query(&self) -> Vec<(String, String)> {
        let countries = serde_json::Value::from(self.params.countries.clone()).to_string();
        let mut query = vec![
            ("access_token".to_string(), self.params.access_token.clone()),
            ("fields".to_string(), self.params.fields.join(",")),
            ("ad_reached_countries".to_string(), countries),
            (
                "ad_active_status".to_string(),
                self.params.active_status.as_param().to_string(),
            ),
            ("ad_type".to_string(), self.params.ad_type.as_param().to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(terms) = &self.params.search_terms {
            query.push(("search_terms".to_string(), terms.clone()));
        }
        if let Some(after) = &self.after {
            query.push(("after".to_string(), after.clone()));
        }
        query
    }
}

/// Pulls the `after` token out of a next-page URL
///
/// Parses the URL when possible. Otherwise the raw `after=` marker is located
/// in the string and read up to the next `&` or `#`.
pub fn extract_continuation_token(next: &str) -> Option<String> {
    if let Ok(url) = Url::parse(next) {
        if let Some((_, token)) = url.query_pairs().find(|(k, _)| k == "after") {
            return Some(token.into_owned()).filter(|t| !t.is_empty());
        }
    }

    let start = next.find("after=")? + "after=".len();
    let raw = next[start..]
        .split(['&', '#'])
        .next()
        .unwrap_or_default();
    url::form_urlencoded::parse(format!("after={}", raw).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .filter(|t| !t.is_empty())
}

/// Timing and budget of a paginated run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSettings {
    /// Maximum number of successful rounds
    pub max_pages: u32,
    /// Fixed wait after a rate-limit signal
    pub cooldown: Duration,
    /// Pause between successful rounds
    pub polite_delay: Duration,
}

impl PaginationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_pages: config.search.max_pages,
            cooldown: Duration::from_secs(config.api.rate_limit_cooldown_secs),
            polite_delay: Duration::from_millis(config.api.polite_delay_ms),
        }
    }
}

/// What a paginated run produced
#[derive(Debug)]
pub struct PaginationReport {
    /// Admitted records in arrival order
    pub records: Vec<Record>,
    /// Successful rounds processed
    pub rounds: u32,
    pub rate_limit_hits: u32,
    pub duplicates: usize,
    pub outcomes: BTreeMap<PageOutcome, usize>,
    pub final_state: PaginationState,
    pub stop_reason: StopReason,
}

impl PaginationReport {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            rounds: 0,
            rate_limit_hits: 0,
            duplicates: 0,
            outcomes: BTreeMap::new(),
            final_state: PaginationState::Fetching,
            stop_reason: StopReason::Exhausted,
        }
    }

    fn count(&mut self, outcome: PageOutcome) {
        *self.outcomes.entry(outcome).or_default() += 1;
    }

    fn finish(mut self, state: PaginationState, reason: StopReason) -> Self {
        self.final_state = state;
        self.stop_reason = reason;
        self
    }
}

/// Drives the token-paginated API
pub struct PaginationController<F> {
    fetcher: F,
    endpoint: Url,
    settings: PaginationSettings,
}

impl<F: Fetcher> PaginationController<F> {
    pub fn new(fetcher: F, endpoint: Url, settings: PaginationSettings) -> Self {
        Self {
            fetcher,
            endpoint,
            settings,
        }
    }

    pub fn settings(&self) -> &PaginationSettings {
        &self.settings
    }

    /// Runs rounds until exhaustion, the page budget, a failure or cancellation
    pub async fn run(&self, first: PageRequest, state: &RunState) -> PaginationReport {
        let mut report = PaginationReport::new();
        let mut request = first;

        loop {
            if self.settings.max_pages == 0 || report.rounds >= self.settings.max_pages {
                return report.finish(PaginationState::Stopped, StopReason::PageBudget);
            }

            // Fetching
            info!(
                "Fetching page {} (after: {})",
                report.rounds + 1,
                request.after.as_deref().unwrap_or("-")
            );
            let fetch = FetchRequest::json(self.endpoint.clone(), request.query());
            let outcome = tokio::select! {
                _ = state.cancel.cancelled() => {
                    return report.finish(PaginationState::Stopped, StopReason::Cancelled);
                }
                outcome = self.fetcher.fetch(&fetch) => outcome,
            };

            let body = match outcome {
                FetchOutcome::Success { body, .. } => body,
                FetchOutcome::RateLimited { retry_after } => {
                    // Backoff: same request, no token advance, no page count
                    report.rate_limit_hits += 1;
                    report.count(PageOutcome::RateLimited);
                    let wait = retry_after.map_or(self.settings.cooldown, |hint| {
                        hint.max(self.settings.cooldown)
                    });
                    warn!("Rate limited; cooling down for {:?}", wait);
                    if !self.pause(wait, state).await {
                        return report.finish(PaginationState::Stopped, StopReason::Cancelled);
                    }
                    continue;
                }
                FetchOutcome::TransientError { cause } => {
                    warn!("Round {} failed: {}", report.rounds + 1, cause);
                    report.count(PageOutcome::TransientError);
                    return report
                        .finish(PaginationState::Stopped, StopReason::Failed(cause.to_string()));
                }
                FetchOutcome::FatalError { cause } => {
                    warn!("Round {} failed: {}", report.rounds + 1, cause);
                    report.count(PageOutcome::FatalError);
                    return report
                        .finish(PaginationState::Stopped, StopReason::Failed(cause.to_string()));
                }
            };

            // Processing
            let page = match ApiPage::parse(&body) {
                Ok(page) => page,
                Err(e) => {
                    warn!("Unparseable API response: {}", e);
                    report.count(PageOutcome::FatalError);
                    return report.finish(
                        PaginationState::Stopped,
                        StopReason::Failed(format!("invalid JSON: {}", e)),
                    );
                }
            };

            let Some(entries) = page.data.as_ref() else {
                warn!("No data field in response");
                report.count(PageOutcome::Empty);
                return report.finish(PaginationState::Exhausted, StopReason::Exhausted);
            };

            if entries.is_empty() {
                info!("No more ads found");
                report.count(PageOutcome::Empty);
                return report.finish(PaginationState::Exhausted, StopReason::Exhausted);
            }

            report.rounds += 1;
            report.count(PageOutcome::Extracted);
            let mut admitted = 0;
            for entry in entries {
                let record = project_api_record(entry);
                if state.seen.admit(&record) {
                    report.records.push(record);
                    admitted += 1;
                } else {
                    debug!("Duplicate ad {} dropped", record.identity);
                    report.duplicates += 1;
                }
            }
            info!(
                "Processed {} ads from page {} ({} new)",
                entries.len(),
                report.rounds,
                admitted
            );

            let Some(token) = page.next_url().and_then(extract_continuation_token) else {
                info!("No more pages available");
                return report.finish(PaginationState::Exhausted, StopReason::Exhausted);
            };

            if report.rounds >= self.settings.max_pages {
                return report.finish(PaginationState::Stopped, StopReason::PageBudget);
            }

            if !self.pause(self.settings.polite_delay, state).await {
                return report.finish(PaginationState::Stopped, StopReason::Cancelled);
            }
            request = request.advance(token);
        }
    }

    /// Sleeps unless cancelled first; returns false on cancellation
    async fn pause(&self, duration: Duration, state: &RunState) -> bool {
        if duration.is_zero() {
            return !state.is_cancelled();
        }
        tokio::select! {
            _ = state.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
