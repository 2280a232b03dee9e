//! Per-run counters.

use std::ops::AddAssign;

/// Counters for one sync invocation. Batch writes return deltas that are
/// folded into the run total with `+=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub total_fetched: u64,
    pub new_records: u64,
    pub duplicates: u64,
    pub errors: u64,
    pub malformed: u64,
    pub lookup_failures: u64,
    pub pages: u64,
    /// Records a dry run would have inserted.
    pub would_insert: u64,
}

impl RunStatistics {
    pub fn has_insert_errors(&self) -> bool {
        self.errors > 0
    }
}

impl AddAssign for RunStatistics {
    fn add_assign(&mut self, other: Self) {
        self.total_fetched += other.total_fetched;
        self.new_records += other.new_records;
        self.duplicates += other.duplicates;
        self.errors += other.errors;
        self.malformed += other.malformed;
        self.lookup_failures += other.lookup_failures;
        self.pages += other.pages;
        self.would_insert += other.would_insert;
    }
}
