//! SQLite sink
//!
//! Every run gets a row in `runs`; its records go to `records`, keyed by
//! `(run_id, identity)` so a record can only be stored once per run.

use crate::config::RunMode;
use crate::output::schema::initialize_schema;
use crate::output::stats::{RunStatus, RunSummary};
use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::record::Record;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

/// SQLite-backed record sink
pub struct SqliteSink {
    conn: Connection,
    run_id: Option<i64>,
}

impl SqliteSink {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> OutputResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn, run_id: None })
    }

    /// Creates an in-memory database
    pub fn in_memory() -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn, run_id: None })
    }

    /// Id of the run started by [`RecordSink::begin_run`]
    pub fn run_id(&self) -> Option<i64> {
        self.run_id
    }

    /// Number of records stored for a run
    pub fn record_count(&self, run_id: i64) -> OutputResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Stored identities of a run, in insertion order
    pub fn identities(&self, run_id: i64) -> OutputResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT identity FROM records WHERE run_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![run_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }

    pub fn run_status(&self, run_id: i64) -> OutputResult<Option<RunStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM runs WHERE id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.and_then(|s| RunStatus::from_db_string(&s)))
    }

    fn current_run(&self) -> OutputResult<i64> {
        self.run_id
            .ok_or_else(|| OutputError::Write("no run started on SQLite sink".to_string()))
    }
}

impl RecordSink for SqliteSink {
    fn begin_run(&mut self, mode: RunMode, config_hash: &str) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO runs (mode, config_hash, started_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                mode.as_str(),
                config_hash,
                Utc::now().to_rfc3339(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        let run_id = self.conn.last_insert_rowid();
        debug!("Started run {} in database", run_id);
        self.run_id = Some(run_id);
        Ok(())
    }

    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        let run_id = self.current_run()?;
        let payload = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO records (run_id, identity, source, captured_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                record.identity,
                record.source.as_str(),
                record.captured_at.to_rfc3339(),
                payload
            ],
        )?;
        Ok(())
    }

    fn finalize(&mut self, summary: &RunSummary) -> OutputResult<()> {
        let run_id = self.current_run()?;
        let finished_at = summary.finished_at.unwrap_or_else(Utc::now).to_rfc3339();
        let record_count = self.record_count(run_id)?;
        self.conn.execute(
            "UPDATE runs
             SET finished_at = ?1, status = ?2, record_count = ?3,
                 duplicates_dropped = ?4, stop_reason = ?5
             WHERE id = ?6",
            params![
                finished_at,
                summary.status.to_db_string(),
                record_count as i64,
                summary.duplicates_dropped as i64,
                summary.stop_reason,
                run_id
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceTag;

    #[test]
    fn test_write_before_begin_fails() {
        let mut sink = SqliteSink::in_memory().unwrap();
        let result = sink.write_record(&Record::new("1", SourceTag::Api));
        assert!(matches!(result, Err(OutputError::Write(_))));
    }

    #[test]
    fn test_run_lifecycle() {
        let mut sink = SqliteSink::in_memory().unwrap();
        sink.begin_run(RunMode::Search, "abc123").unwrap();
        let run_id = sink.run_id().unwrap();
        assert_eq!(sink.run_status(run_id).unwrap(), Some(RunStatus::Running));

        sink.write_record(&Record::new("1", SourceTag::Api)).unwrap();
        sink.write_record(&Record::new("2", SourceTag::Api)).unwrap();

        let mut summary = RunSummary::new(RunMode::Search, "abc123");
        summary.finish(RunStatus::Completed, "exhausted");
        sink.finalize(&summary).unwrap();

        assert_eq!(sink.run_status(run_id).unwrap(), Some(RunStatus::Completed));
        assert_eq!(sink.record_count(run_id).unwrap(), 2);
        assert_eq!(sink.identities(run_id).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_identity_unique_per_run() {
        let mut sink = SqliteSink::in_memory().unwrap();
        sink.begin_run(RunMode::Crawl, "h").unwrap();
        let first_run = sink.run_id().unwrap();

        sink.write_record(&Record::new("same", SourceTag::Heuristic))
            .unwrap();
        sink.write_record(&Record::new("same", SourceTag::Heuristic))
            .unwrap();
        assert_eq!(sink.record_count(first_run).unwrap(), 1);

        // A new run may store the same identity again
        sink.begin_run(RunMode::Crawl, "h").unwrap();
        let second_run = sink.run_id().unwrap();
        assert_ne!(first_run, second_run);
        sink.write_record(&Record::new("same", SourceTag::Heuristic))
            .unwrap();
        assert_eq!(sink.record_count(second_run).unwrap(), 1);
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.db");

        let run_id = {
            let mut sink = SqliteSink::new(&path).unwrap();
            sink.begin_run(RunMode::Search, "h").unwrap();
            sink.write_record(&Record::new("9", SourceTag::Api)).unwrap();
            sink.run_id().unwrap()
        };

        let sink = SqliteSink::new(&path).unwrap();
        assert_eq!(sink.record_count(run_id).unwrap(), 1);
    }
}
