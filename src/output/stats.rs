//! Run summaries
//!
//! Both controllers report into a [`RunSummary`], which the sinks persist and
//! the binary prints once the run is over.

use crate::config::RunMode;
use crate::state::PageOutcome;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Summary statistics for a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: RunMode,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,

    /// Successful rounds (search) or fetched pages (crawl)
    pub units: u64,
    pub records_emitted: u64,
    pub duplicates_dropped: u64,
    pub rate_limit_hits: u64,

    /// Per-unit outcome counts
    pub outcomes: BTreeMap<PageOutcome, u64>,

    pub stop_reason: String,
}

impl RunSummary {
    /// Creates an empty summary for a run starting now
    pub fn new(mode: RunMode, config_hash: &str) -> Self {
        Self {
            mode,
            config_hash: config_hash.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            units: 0,
            records_emitted: 0,
            duplicates_dropped: 0,
            rate_limit_hits: 0,
            outcomes: BTreeMap::new(),
            stop_reason: String::new(),
        }
    }

    /// Marks the run finished now
    pub fn finish(&mut self, status: RunStatus, stop_reason: impl Into<String>) {
        self.finished_at = Some(Utc::now());
        self.status = status;
        self.stop_reason = stop_reason.into();
    }

    pub fn duration_seconds(&self) -> Option<u64> {
        self.finished_at
            .map(|f| (f - self.started_at).num_seconds().max(0) as u64)
    }

    /// Units that ended in an error outcome
    pub fn error_count(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|(o, _)| o.is_error())
            .map(|(_, n)| n)
            .sum()
    }

    /// Returns the success rate as a percentage of units with an outcome
    pub fn success_rate(&self) -> f64 {
        let total: u64 = self.outcomes.values().sum();
        if total == 0 {
            return 0.0;
        }
        let ok: u64 = self
            .outcomes
            .iter()
            .filter(|(o, _)| o.is_success())
            .map(|(_, n)| n)
            .sum();
        (ok as f64 / total as f64) * 100.0
    }
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    let unit = match summary.mode {
        RunMode::Search => "Rounds",
        RunMode::Crawl => "Pages fetched",
    };

    println!("=== Run Summary ({}) ===\n", summary.mode.as_str());
    println!("  Status: {}", summary.status.to_db_string());
    println!("  Stopped: {}", summary.stop_reason);
    if let Some(secs) = summary.duration_seconds() {
        println!("  Duration: {}s", secs);
    }
    println!("  {}: {}", unit, summary.units);
    println!("  Records emitted: {}", summary.records_emitted);
    println!("  Duplicates dropped: {}", summary.duplicates_dropped);
    if summary.rate_limit_hits > 0 {
        println!("  Rate limit hits: {}", summary.rate_limit_hits);
    }
    println!();

    if !summary.outcomes.is_empty() {
        println!("Outcomes:");
        for (outcome, count) in &summary.outcomes {
            println!("  {}: {}", outcome, count);
        }
        println!();
    }

    println!("Success Rate: {:.1}%", summary.success_rate());
}
