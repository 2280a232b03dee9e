//! Diesel ORM models for database tables.
//!
//! These models provide compile-time type checking for database operations.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::models::{StatusRecord, SyncMetadata, SyncStatus};
use crate::schema;

/// New status row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::site_status_interne)]
pub struct NewStatusRow<'a> {
    pub site: &'a str,
    pub status: i32,
    pub ms: i32,
    pub pod: &'a str,
    pub redir: Option<&'a str>,
    pub cross_domain: bool,
    pub timestamp: i64,
}

impl<'a> From<&'a StatusRecord> for NewStatusRow<'a> {
    fn from(record: &'a StatusRecord) -> Self {
        Self {
            site: &record.site,
            status: record.status,
            ms: record.ms,
            pod: &record.pod,
            redir: record.redir.as_deref(),
            cross_domain: record.cross_domain,
            timestamp: record.time,
        }
    }
}

/// Sync metadata row from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::sync_metadata_status_interne)]
pub struct SyncMetadataRecord {
    pub id: i32,
    pub last_sync_timestamp: Option<i64>,
    pub last_sync_date: Option<NaiveDateTime>,
    pub total_records_synced: i64,
    pub last_sync_status: Option<String>,
    pub last_error_message: Option<String>,
}

impl From<SyncMetadataRecord> for SyncMetadata {
    fn from(record: SyncMetadataRecord) -> Self {
        SyncMetadata {
            last_sync_timestamp: record.last_sync_timestamp,
            last_sync_date: record.last_sync_date,
            total_records_synced: record.total_records_synced,
            last_sync_status: record
                .last_sync_status
                .as_deref()
                .and_then(SyncStatus::from_str),
            last_error_message: record.last_error_message,
        }
    }
}

/// New metadata row, used when the singleton row does not exist yet.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::sync_metadata_status_interne)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewSyncMetadata<'a> {
    pub id: i32,
    pub last_sync_timestamp: Option<i64>,
    pub last_sync_date: Option<NaiveDateTime>,
    pub total_records_synced: i64,
    pub last_sync_status: Option<&'a str>,
    pub last_error_message: Option<&'a str>,
}
