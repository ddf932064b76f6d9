//! Record sink trait and error types

use crate::config::RunMode;
use crate::output::stats::RunSummary;
use crate::record::Record;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the records of a run
///
/// A run calls [`RecordSink::begin_run`] once, then
/// [`RecordSink::write_record`] for every admitted record in order, then
/// [`RecordSink::finalize`] once, even when the run was cancelled.
pub trait RecordSink {
    fn begin_run(&mut self, mode: RunMode, config_hash: &str) -> OutputResult<()> {
        let _ = (mode, config_hash);
        Ok(())
    }

    fn write_record(&mut self, record: &Record) -> OutputResult<()>;

    /// Flushes buffered output and records the outcome of the run
    fn finalize(&mut self, summary: &RunSummary) -> OutputResult<()>;
}

/// In-memory sink
impl RecordSink for Vec<Record> {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        self.push(record.clone());
        Ok(())
    }

    fn finalize(&mut self, _summary: &RunSummary) -> OutputResult<()> {
        Ok(())
    }
}

/// Forwards every call to each contained sink in order
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn RecordSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for SinkSet {
    fn begin_run(&mut self, mode: RunMode, config_hash: &str) -> OutputResult<()> {
        self.sinks
            .iter_mut()
            .try_for_each(|s| s.begin_run(mode, config_hash))
    }

    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        self.sinks.iter_mut().try_for_each(|s| s.write_record(record))
    }

    fn finalize(&mut self, summary: &RunSummary) -> OutputResult<()> {
        self.sinks.iter_mut().try_for_each(|s| s.finalize(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceTag;

    #[test]
    fn test_vec_sink_keeps_order() {
        let mut sink: Vec<Record> = Vec::new();
        sink.write_record(&Record::new("a", SourceTag::Api)).unwrap();
        sink.write_record(&Record::new("b", SourceTag::Api)).unwrap();
        sink.finalize(&RunSummary::new(RunMode::Search, "hash")).unwrap();

        let ids: Vec<_> = sink.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sink_set_fans_out() {
        struct Counting(std::rc::Rc<std::cell::Cell<usize>>);
        impl RecordSink for Counting {
            fn write_record(&mut self, _record: &Record) -> OutputResult<()> {
                self.0.set(self.0.get() + 1);
                Ok(())
            }
            fn finalize(&mut self, _summary: &RunSummary) -> OutputResult<()> {
                Ok(())
            }
        }

        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut set = SinkSet::new();
        set.push(Box::new(Counting(count.clone())));
        set.push(Box::new(Counting(count.clone())));

        set.write_record(&Record::new("x", SourceTag::Heuristic)).unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(set.len(), 2);
    }
}
