//! Sync progress metadata kept in the singleton metadata row.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Well-known id of the metadata row.
pub const SYNC_METADATA_ID: i32 = 1;

/// Overall outcome of the last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Success,
    Partial,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

/// Contents of the metadata row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncMetadata {
    pub last_sync_timestamp: Option<i64>,
    pub last_sync_date: Option<NaiveDateTime>,
    pub total_records_synced: i64,
    pub last_sync_status: Option<SyncStatus>,
    pub last_error_message: Option<String>,
}

/// Values written to the metadata row at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataUpdate {
    pub synced_at: DateTime<Utc>,
    /// Added to the cumulative total.
    pub new_records: u64,
    pub status: SyncStatus,
    pub error_message: Option<String>,
}

impl MetadataUpdate {
    /// Derive the update from a run's counters.
    pub fn for_run(new_records: u64, error_count: u64, synced_at: DateTime<Utc>) -> Self {
        let (status, error_message) = if error_count == 0 {
            (SyncStatus::Success, None)
        } else {
            (SyncStatus::Partial, Some(format!("{} errors", error_count)))
        };

        Self {
            synced_at,
            new_records,
            status,
            error_message,
        }
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.synced_at.timestamp_millis()
    }

    pub fn sync_date(&self) -> NaiveDateTime {
        self.synced_at.naive_utc()
    }

    /// Apply this update on top of the current row contents.
    pub fn apply(&self, current: &SyncMetadata) -> SyncMetadata {
        SyncMetadata {
            last_sync_timestamp: Some(self.timestamp_millis()),
            last_sync_date: Some(self.sync_date()),
            total_records_synced: current.total_records_synced + self.new_records as i64,
            last_sync_status: Some(self.status),
            last_error_message: self.error_message.clone(),
        }
    }
}
