use crate::record::Record;
use std::collections::HashSet;
use std::sync::Mutex;

/// Run-scoped record deduplicator
///
/// Keyed by [`Record::identity`]. Admission is a single critical section, so
/// concurrent workers can share one deduplicator by reference.
#[derive(Debug, Default)]
pub struct RecordDeduplicator {
    seen: Mutex<HashSet<String>>,
}

impl RecordDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the record's identity
    ///
    /// Returns `true` when the identity had not been seen in this run, `false`
    /// when the caller should drop the record.
    pub fn admit(&self, record: &Record) -> bool {
        self.admit_identity(&record.identity)
    }

    pub fn admit_identity(&self, identity: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(identity.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceTag;
    use std::sync::Arc;

    #[test]
    fn test_first_admission_wins() {
        let dedup = RecordDeduplicator::new();
        let record = Record::new("123", SourceTag::Api);

        assert!(dedup.admit(&record));
        assert!(!dedup.admit(&record));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_identity_only() {
        let dedup = RecordDeduplicator::new();
        let mut a = Record::new("same", SourceTag::Api);
        a.set("page_name", "A");
        let mut b = Record::new("same", SourceTag::Heuristic);
        b.set("page_name", "B");

        assert!(dedup.admit(&a));
        assert!(!dedup.admit(&b));
    }

    #[test]
    fn test_concurrent_admission_is_exclusive() {
        let dedup = Arc::new(RecordDeduplicator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dedup = Arc::clone(&dedup);
                std::thread::spawn(move || dedup.admit_identity("shared"))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, 1);
    }
}
