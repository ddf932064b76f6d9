//! Run-scoped state
//!
//! Everything a single run mutates lives here and is created when the run
//! starts. Nothing is process-global, so concurrent runs stay isolated.
//!
//! # Components
//!
//! - `VisitedSet`: pages already fetched by the crawl
//! - `RecordDeduplicator`: identities already emitted
//! - `PageOutcome`: how each page or round ended

mod page_state;
mod seen;
mod visited;

pub use page_state::PageOutcome;
pub use seen::RecordDeduplicator;
pub use visited::VisitedSet;

use tokio_util::sync::CancellationToken;

/// State owned by one search or crawl run
#[derive(Debug, Default)]
pub struct RunState {
    pub visited: VisitedSet,
    pub seen: RecordDeduplicator,
    pub cancel: CancellationToken,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates run state that stops when `cancel` fires
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            visited: VisitedSet::new(),
            seen: RecordDeduplicator::new(),
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
