//! Pluggable destination store trait.
//!
//! Allows swapping between the Diesel backend (SQLite or MySQL) and the
//! in-memory store used for tests and embedding.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{MetadataUpdate, RecordKey, StatusRecord, SyncMetadata};

/// Overall contents of the destination store, for the run report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSummary {
    pub total_records: i64,
    pub distinct_sites: i64,
    pub metadata: Option<SyncMetadata>,
}

/// An open destination store. Dropping it releases the underlying connection.
#[async_trait]
pub trait StatusStore: Send {
    /// Natural keys already stored for the given sites. Only rows whose site
    /// is in `sites` are considered.
    async fn existing_keys(&mut self, sites: &BTreeSet<String>) -> StoreResult<HashSet<RecordKey>>;

    /// Insert all records in one transaction. Either every record is written
    /// or none is.
    async fn insert_batch(&mut self, records: &[&StatusRecord]) -> StoreResult<usize>;

    /// Write the singleton metadata row, creating it if absent.
    async fn update_metadata(&mut self, update: &MetadataUpdate) -> StoreResult<()>;

    /// Record and site counts plus the current metadata row.
    async fn summary(&mut self) -> StoreResult<StoreSummary>;
}

/// Opens destination stores.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: StatusStore;

    /// Human-readable target for logs (credentials redacted).
    fn describe(&self) -> String;

    async fn connect(&self) -> StoreResult<Self::Store>;
}
