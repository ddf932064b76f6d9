//! JSON Lines sink

use crate::output::stats::RunSummary;
use crate::output::traits::{OutputResult, RecordSink};
use crate::record::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl JsonLinesSink<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of lines written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finalize(&mut self, _summary: &RunSummary) -> OutputResult<()> {
        self.writer.flush()?;
        debug!("JSON Lines sink flushed ({} records)", self.written);
        Ok(())
    }
}
