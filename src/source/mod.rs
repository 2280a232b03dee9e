//! Remote record sources.

mod http;

pub use http::{HttpRecordSource, USER_AGENT};

use async_trait::async_trait;
use tracing::warn;

use crate::error::SourceError;
use crate::models::StatusRecord;

/// One page returned by a paginated fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    /// Records that passed validation.
    pub records: Vec<StatusRecord>,
    /// Number of items the remote returned, valid or not.
    pub raw_len: usize,
    /// Items rejected by validation.
    pub malformed: usize,
    /// `count` as reported by the remote envelope.
    pub reported_count: u64,
}

impl FetchedPage {
    /// Validate raw JSON items, logging and counting the ones that fail.
    pub fn from_items(items: &[serde_json::Value], reported_count: u64) -> Self {
        let mut records = Vec::with_capacity(items.len());
        let mut malformed = 0;

        for (index, item) in items.iter().enumerate() {
            match StatusRecord::from_json(item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    malformed += 1;
                    warn!("Skipping record {} on page: {}", index, e);
                }
            }
        }

        Self {
            records,
            raw_len: items.len(),
            malformed,
            reported_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_len == 0
    }

    /// A page shorter than the requested size is the last one.
    pub fn is_last(&self, page_size: usize) -> bool {
        self.raw_len < page_size
    }
}

/// A paginated source of status records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch up to `limit` records starting at `offset`.
    async fn fetch(&self, limit: usize, offset: usize) -> Result<FetchedPage, SourceError>;
}
