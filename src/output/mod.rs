//! Output module
//!
//! Records leave a run through a [`RecordSink`]:
//! - [`JsonLinesSink`] writes one JSON object per line
//! - [`SqliteSink`] stores runs and records in a SQLite database
//! - `Vec<Record>` collects them in memory
//!
//! [`SinkSet`] fans out to several sinks at once, and [`RunSummary`] carries
//! the statistics of a finished run.

mod jsonl;
mod schema;
mod sqlite;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use schema::initialize_schema;
pub use sqlite::SqliteSink;
pub use stats::{print_summary, RunStatus, RunSummary};
pub use traits::{OutputError, OutputResult, RecordSink, SinkSet};
