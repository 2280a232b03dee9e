//! Deduplicating batch writer.

use std::collections::{BTreeSet, HashSet};

use tracing::{error, info, warn};

use crate::models::{RecordKey, RunStatistics, StatusRecord};
use crate::repository::StatusStore;

/// Writes only records whose natural key is not already stored.
#[derive(Debug, Clone, Copy)]
pub struct BatchWriter {
    dry_run: bool,
}

impl BatchWriter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Deduplicate one batch against the store and insert what is new.
    ///
    /// Returns the statistics delta for this batch. A failed key lookup is
    /// treated as "nothing exists yet"; a failed insert counts every
    /// attempted record as an error and leaves the store unchanged.
    pub async fn write<S>(&self, store: &mut S, records: &[StatusRecord]) -> RunStatistics
    where
        S: StatusStore + ?Sized,
    {
        let mut delta = RunStatistics::default();
        if records.is_empty() {
            return delta;
        }

        let sites: BTreeSet<String> = records.iter().map(|r| r.site.clone()).collect();
        let existing = match store.existing_keys(&sites).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(
                    "Dedupe lookup failed for {} sites, treating all {} records as new: {}",
                    sites.len(),
                    records.len(),
                    e
                );
                delta.lookup_failures += 1;
                HashSet::new()
            }
        };

        let (fresh, duplicates) = partition_new(records, &existing);
        delta.duplicates += duplicates;

        if fresh.is_empty() {
            return delta;
        }

        if self.dry_run {
            info!("[dry run] {} new records would be inserted", fresh.len());
            delta.would_insert += fresh.len() as u64;
            return delta;
        }

        match store.insert_batch(&fresh).await {
            Ok(written) => {
                info!("{} new records inserted", written);
                delta.new_records += written as u64;
            }
            Err(e) => {
                error!("Batch insert of {} records rolled back: {}", fresh.len(), e);
                delta.errors += fresh.len() as u64;
            }
        }

        delta
    }
}

/// Split a batch into records to insert and a duplicate count. A key seen
/// earlier in the same batch counts as a duplicate too.
fn partition_new<'a>(
    records: &'a [StatusRecord],
    existing: &HashSet<RecordKey>,
) -> (Vec<&'a StatusRecord>, u64) {
    let mut seen = HashSet::with_capacity(records.len());
    let mut fresh = Vec::with_capacity(records.len());
    let mut duplicates = 0;

    for record in records {
        let key = record.key();
        if existing.contains(&key) || !seen.insert(key) {
            duplicates += 1;
        } else {
            fresh.push(record);
        }
    }

    (fresh, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{FailureModes, MemoryDatabase};

    fn record(site: &str, time: i64) -> StatusRecord {
        StatusRecord {
            site: site.to_string(),
            status: 200,
            ms: 20,
            pod: "pod-a".to_string(),
            redir: None,
            cross_domain: false,
            time,
        }
    }

    #[tokio::test]
    async fn test_disjoint_batch_inserts_everything() {
        let db = MemoryDatabase::new();
        db.seed([record("a.com", 1)]);
        let mut store = db.open().unwrap();

        let batch = vec![record("a.com", 2), record("b.com", 1), record("c.com", 1)];
        let delta = BatchWriter::new(false).write(&mut store, &batch).await;

        assert_eq!(delta.new_records, 3);
        assert_eq!(delta.duplicates, 0);
        assert_eq!(db.row_count(), 4);
    }

    #[tokio::test]
    async fn test_one_existing_of_three() {
        let db = MemoryDatabase::new();
        db.seed([record("a.com", 1)]);
        let mut store = db.open().unwrap();

        let batch = vec![record("a.com", 1), record("a.com", 2), record("b.com", 1)];
        let delta = BatchWriter::new(false).write(&mut store, &batch).await;

        assert_eq!(delta.duplicates, 1);
        assert_eq!(delta.new_records, 2);
        assert_eq!(db.row_count(), 3);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let db = MemoryDatabase::new();
        let mut store = db.open().unwrap();
        let writer = BatchWriter::new(false);
        let batch: Vec<_> = (0..5).map(|i| record("a.com", i)).collect();

        writer.write(&mut store, &batch).await;
        let delta = writer.write(&mut store, &batch).await;

        assert_eq!(delta.new_records, 0);
        assert_eq!(delta.duplicates, 5);
        assert_eq!(db.row_count(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_within_batch_written_once() {
        let db = MemoryDatabase::new();
        let mut store = db.open().unwrap();

        let batch = vec![record("a.com", 1), record("a.com", 1)];
        let delta = BatchWriter::new(false).write(&mut store, &batch).await;

        assert_eq!(delta.new_records, 1);
        assert_eq!(delta.duplicates, 1);
        assert_eq!(db.row_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_failure_counts_whole_batch() {
        let db = MemoryDatabase::new();
        let mut store = db.open().unwrap();
        db.set_failures(FailureModes {
            insert: true,
            ..Default::default()
        });

        let batch: Vec<_> = (0..10).map(|i| record("a.com", i)).collect();
        let delta = BatchWriter::new(false).write(&mut store, &batch).await;

        assert_eq!(delta.errors, 10);
        assert_eq!(delta.new_records, 0);
        assert_eq!(db.row_count(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_open() {
        let db = MemoryDatabase::new();
        db.seed([record("a.com", 1)]);
        let mut store = db.open().unwrap();
        db.set_failures(FailureModes {
            lookup: true,
            ..Default::default()
        });

        let batch = vec![record("a.com", 1), record("a.com", 2)];
        let delta = BatchWriter::new(false).write(&mut store, &batch).await;

        // The already-stored record is written again: fail-open is visible.
        assert_eq!(delta.lookup_failures, 1);
        assert_eq!(delta.new_records, 2);
        assert_eq!(delta.duplicates, 0);
        assert_eq!(db.row_count(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_never_writes() {
        let db = MemoryDatabase::new();
        db.seed([record("a.com", 1)]);
        let mut store = db.open().unwrap();

        let batch = vec![record("a.com", 1), record("b.com", 1), record("c.com", 1)];
        let delta = BatchWriter::new(true).write(&mut store, &batch).await;

        assert_eq!(delta.would_insert, 2);
        assert_eq!(delta.duplicates, 1);
        assert_eq!(delta.new_records, 0);
        assert_eq!(db.row_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let db = MemoryDatabase::new();
        let mut store = db.open().unwrap();
        let delta = BatchWriter::new(false).write(&mut store, &[]).await;
        assert_eq!(delta, RunStatistics::default());
    }
}
