//! Per-unit outcome accounting
//!
//! Every page (crawl mode) or round (search mode) ends in exactly one of these
//! outcomes. None of them aborts a run.

use std::fmt;

/// How the processing of one page or round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageOutcome {
    // ===== Success States =====
    /// Fetched and at least one record was extracted
    Extracted,

    /// Fetched, but nothing passed the quality filter
    Empty,

    // ===== Skip States =====
    /// URL was already visited in this run
    AlreadyVisited,

    /// Content-Type was not HTML
    ContentMismatch,

    // ===== Error States =====
    /// The platform asked us to slow down
    RateLimited,

    /// Timeout, connection failure or 5xx
    TransientError,

    /// Malformed request, unparseable body or other 4xx
    FatalError,
}

impl PageOutcome {
    /// All outcomes, in reporting order
    pub const ALL: [PageOutcome; 7] = [
        Self::Extracted,
        Self::Empty,
        Self::AlreadyVisited,
        Self::ContentMismatch,
        Self::RateLimited,
        Self::TransientError,
        Self::FatalError,
    ];

    /// Returns true if the unit was fetched successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted | Self::Empty)
    }

    /// Returns true if the unit was skipped without a fetch error
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::AlreadyVisited | Self::ContentMismatch)
    }

    /// Returns true if this represents an error
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::TransientError | Self::FatalError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::Empty => "empty",
            Self::AlreadyVisited => "already_visited",
            Self::ContentMismatch => "content_mismatch",
            Self::RateLimited => "rate_limited",
            Self::TransientError => "transient_error",
            Self::FatalError => "fatal_error",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
