//! In-memory status store.
//!
//! Keeps rows and metadata in a shared, lock-protected state so a database
//! handle can be inspected after a sync run has consumed its store. Supports
//! failure injection for connect, lookup, insert and metadata operations.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::store::{StatusStore, StoreConnector, StoreSummary};
use crate::error::{StoreError, StoreResult};
use crate::models::{MetadataUpdate, RecordKey, StatusRecord, SyncMetadata};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureModes {
    pub connect: bool,
    pub lookup: bool,
    pub insert: bool,
    pub metadata: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<StatusRecord>,
    metadata: Option<SyncMetadata>,
    failures: FailureModes,
    connects: usize,
    open_connections: usize,
    metadata_writes: usize,
}

/// Shared in-memory database. Clones refer to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-existing metadata row.
    pub fn with_metadata(self, metadata: SyncMetadata) -> Self {
        self.lock().metadata = Some(metadata);
        self
    }

    pub fn set_failures(&self, failures: FailureModes) {
        self.lock().failures = failures;
    }

    /// Seed rows directly, bypassing dedupe.
    pub fn seed(&self, records: impl IntoIterator<Item = StatusRecord>) {
        self.lock().rows.extend(records);
    }

    pub fn row_count(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn metadata(&self) -> Option<SyncMetadata> {
        self.lock().metadata.clone()
    }

    /// Number of successful connects so far.
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Stores handed out and not yet dropped.
    pub fn open_connections(&self) -> usize {
        self.lock().open_connections
    }

    pub fn metadata_writes(&self) -> usize {
        self.lock().metadata_writes
    }

    /// Open a store on this database.
    pub fn open(&self) -> StoreResult<MemoryStatusStore> {
        let mut state = self.lock();
        if state.failures.connect {
            return Err(StoreError::Connection("memory database unavailable".to_string()));
        }
        state.connects += 1;
        state.open_connections += 1;
        Ok(MemoryStatusStore { db: self.clone() })
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StoreConnector for MemoryDatabase {
    type Store = MemoryStatusStore;

    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn connect(&self) -> StoreResult<MemoryStatusStore> {
        self.open()
    }
}

/// An open handle on a [`MemoryDatabase`].
#[derive(Debug)]
pub struct MemoryStatusStore {
    db: MemoryDatabase,
}

impl Drop for MemoryStatusStore {
    fn drop(&mut self) {
        let mut state = self.db.lock();
        state.open_connections = state.open_connections.saturating_sub(1);
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn existing_keys(&mut self, sites: &BTreeSet<String>) -> StoreResult<HashSet<RecordKey>> {
        let state = self.db.lock();
        if state.failures.lookup {
            return Err(StoreError::Query("lookup failure injected".to_string()));
        }
        Ok(state
            .rows
            .iter()
            .filter(|r| sites.contains(&r.site))
            .map(StatusRecord::key)
            .collect())
    }

    async fn insert_batch(&mut self, records: &[&StatusRecord]) -> StoreResult<usize> {
        let mut state = self.db.lock();
        if state.failures.insert {
            return Err(StoreError::Insert("insert failure injected".to_string()));
        }
        state.rows.extend(records.iter().map(|r| (*r).clone()));
        Ok(records.len())
    }

    async fn update_metadata(&mut self, update: &MetadataUpdate) -> StoreResult<()> {
        let mut state = self.db.lock();
        if state.failures.metadata {
            return Err(StoreError::Query("metadata failure injected".to_string()));
        }
        let current = state.metadata.clone().unwrap_or_default();
        state.metadata = Some(update.apply(&current));
        state.metadata_writes += 1;
        Ok(())
    }

    async fn summary(&mut self) -> StoreResult<StoreSummary> {
        let state = self.db.lock();
        let sites: BTreeSet<&str> = state.rows.iter().map(|r| r.site.as_str()).collect();
        Ok(StoreSummary {
            total_records: state.rows.len() as i64,
            distinct_sites: sites.len() as i64,
            metadata: state.metadata.clone(),
        })
    }
}
