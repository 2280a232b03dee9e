//! Diesel-based status store for SQLite and MySQL.
//!
//! Uses diesel-async's SyncConnectionWrapper for async SQLite support.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use diesel::dsl::{count_distinct, count_star};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use super::connection::DbConnection;
use super::diesel_models::{NewStatusRow, NewSyncMetadata, SyncMetadataRecord};
use super::store::{StatusStore, StoreConnector, StoreSummary};
use super::util::redact_url_password;
use crate::error::{StoreError, StoreResult};
use crate::models::{MetadataUpdate, RecordKey, StatusRecord, SYNC_METADATA_ID};
use crate::schema::{site_status_interne, sync_metadata_status_interne};
use crate::with_conn;

/// Diesel status store holding one open connection.
pub struct DieselStatusStore {
    conn: DbConnection,
}

impl DieselStatusStore {
    pub fn new(conn: DbConnection) -> Self {
        Self { conn }
    }

    /// Open a store for a database URL.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let conn = DbConnection::establish(url).await?;
        debug!(
            "Opened {} connection to {}",
            conn.backend().as_str(),
            redact_url_password(url)
        );
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl StatusStore for DieselStatusStore {
    async fn existing_keys(&mut self, sites: &BTreeSet<String>) -> StoreResult<HashSet<RecordKey>> {
        if sites.is_empty() {
            return Ok(HashSet::new());
        }

        let site_count = sites.len();
        let site_list: Vec<&str> = sites.iter().map(String::as_str).collect();
        let rows: Vec<(String, i64)> = with_conn!(&mut self.conn, conn => {
            site_status_interne::table
                .filter(site_status_interne::site.eq_any(site_list))
                .select((site_status_interne::site, site_status_interne::timestamp))
                .load::<(String, i64)>(conn)
                .await
        })?;

        debug!("Loaded {} existing keys for {} sites", rows.len(), site_count);

        Ok(rows
            .into_iter()
            .map(|(site, timestamp)| RecordKey { site, timestamp })
            .collect())
    }

    async fn insert_batch(&mut self, records: &[&StatusRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let rows: Vec<NewStatusRow<'_>> = records.iter().map(|r| NewStatusRow::from(*r)).collect();

        let written = with_conn!(&mut self.conn, conn => {
            conn.transaction(|conn| {
                Box::pin(async move {
                    let mut written = 0;
                    for row in &rows {
                        written += diesel::insert_into(site_status_interne::table)
                            .values(row)
                            .execute(conn)
                            .await?;
                    }
                    Ok::<_, diesel::result::Error>(written)
                })
            })
            .await
        })
        .map_err(|e| StoreError::Insert(e.to_string()))?;

        Ok(written)
    }

    async fn update_metadata(&mut self, update: &MetadataUpdate) -> StoreResult<()> {
        let timestamp = update.timestamp_millis();
        let sync_date = update.sync_date();
        let new_records = update.new_records as i64;
        let status = update.status.as_str();
        let error_message = update.error_message.as_deref();

        with_conn!(&mut self.conn, conn => {
            let updated = diesel::update(
                sync_metadata_status_interne::table.find(SYNC_METADATA_ID),
            )
            .set((
                sync_metadata_status_interne::last_sync_timestamp.eq(Some(timestamp)),
                sync_metadata_status_interne::last_sync_date.eq(Some(sync_date)),
                sync_metadata_status_interne::total_records_synced
                    .eq(sync_metadata_status_interne::total_records_synced + new_records),
                sync_metadata_status_interne::last_sync_status.eq(Some(status)),
                sync_metadata_status_interne::last_error_message.eq(error_message),
            ))
            .execute(conn)
            .await?;

            if updated == 0 {
                debug!("Metadata row {} missing, creating it", SYNC_METADATA_ID);
                let row = NewSyncMetadata {
                    id: SYNC_METADATA_ID,
                    last_sync_timestamp: Some(timestamp),
                    last_sync_date: Some(sync_date),
                    total_records_synced: new_records,
                    last_sync_status: Some(status),
                    last_error_message: error_message,
                };
                diesel::insert_into(sync_metadata_status_interne::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
            }

            Ok::<_, diesel::result::Error>(())
        })?;

        Ok(())
    }

    async fn summary(&mut self) -> StoreResult<StoreSummary> {
        let (total_records, distinct_sites, metadata) = with_conn!(&mut self.conn, conn => {
            let total: i64 = site_status_interne::table
                .select(count_star())
                .first(conn)
                .await?;
            let sites: i64 = site_status_interne::table
                .select(count_distinct(site_status_interne::site))
                .first(conn)
                .await?;
            let metadata = sync_metadata_status_interne::table
                .find(SYNC_METADATA_ID)
                .first::<SyncMetadataRecord>(conn)
                .await
                .optional()?;
            Ok::<_, diesel::result::Error>((total, sites, metadata))
        })?;

        Ok(StoreSummary {
            total_records,
            distinct_sites,
            metadata: metadata.map(Into::into),
        })
    }
}

/// Connects to the database named by a URL.
#[derive(Debug, Clone)]
pub struct DatabaseConnector {
    url: String,
}

impl DatabaseConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl StoreConnector for DatabaseConnector {
    type Store = DieselStatusStore;

    fn describe(&self) -> String {
        redact_url_password(&self.url)
    }

    async fn connect(&self) -> StoreResult<DieselStatusStore> {
        DieselStatusStore::connect(&self.url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use diesel_async::SimpleAsyncConnection;
    use tempfile::tempdir;

    use crate::models::SyncStatus;

    const TEST_SCHEMA: &str = r#"
        CREATE TABLE site_status_interne (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site TEXT NOT NULL,
            status INTEGER NOT NULL,
            ms INTEGER NOT NULL CHECK (ms >= 0),
            pod TEXT NOT NULL,
            redir TEXT,
            cross_domain BOOLEAN NOT NULL DEFAULT 0,
            timestamp BIGINT NOT NULL
        );
        CREATE TABLE sync_metadata_status_interne (
            id INTEGER PRIMARY KEY,
            last_sync_timestamp BIGINT,
            last_sync_date TIMESTAMP,
            total_records_synced BIGINT NOT NULL DEFAULT 0,
            last_sync_status TEXT,
            last_error_message TEXT
        );
    "#;

    async fn setup_test_db() -> (DieselStatusStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_url = dir.path().join("test.db").display().to_string();

        let mut store = DieselStatusStore::connect(&db_url).await.unwrap();
        match &mut store.conn {
            DbConnection::Sqlite(conn) => conn.batch_execute(TEST_SCHEMA).await.unwrap(),
            #[cfg(feature = "mysql")]
            DbConnection::Mysql(_) => unreachable!(),
        }

        (store, dir)
    }

    fn record(site: &str, time: i64) -> StatusRecord {
        StatusRecord {
            site: site.to_string(),
            status: 200,
            ms: 35,
            pod: "pod-1".to_string(),
            redir: None,
            cross_domain: false,
            time,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup_keys() {
        let (mut store, _dir) = setup_test_db().await;

        let mut redirected = record("b.com", 2);
        redirected.status = 301;
        redirected.redir = Some("https://elsewhere.net/".to_string());
        redirected.cross_domain = true;
        let records = [record("a.com", 1), redirected, record("c.com", 3)];
        let refs: Vec<&StatusRecord> = records.iter().collect();

        assert_eq!(store.insert_batch(&refs).await.unwrap(), 3);

        let sites: BTreeSet<String> = ["a.com", "b.com"].iter().map(|s| s.to_string()).collect();
        let keys = store.existing_keys(&sites).await.unwrap();

        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&RecordKey::new("a.com", 1)));
        assert!(keys.contains(&RecordKey::new("b.com", 2)));
        assert!(!keys.contains(&RecordKey::new("c.com", 3)));
    }

    #[tokio::test]
    async fn test_existing_keys_empty_site_set() {
        let (mut store, _dir) = setup_test_db().await;
        let keys = store.existing_keys(&BTreeSet::new()).await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_full_page_insert_in_one_transaction() {
        let (mut store, _dir) = setup_test_db().await;

        let records: Vec<StatusRecord> = (0..5000).map(|i| record("bulk.com", i)).collect();
        let refs: Vec<&StatusRecord> = records.iter().collect();

        assert_eq!(store.insert_batch(&refs).await.unwrap(), 5000);
        assert_eq!(store.summary().await.unwrap().total_records, 5000);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_whole_batch() {
        let (mut store, _dir) = setup_test_db().await;

        // The last row violates the CHECK constraint after the earlier rows
        // were already inserted inside the transaction.
        let mut records: Vec<StatusRecord> = (0..600).map(|i| record("x.com", i)).collect();
        records[599].ms = -1;
        let refs: Vec<&StatusRecord> = records.iter().collect();

        let err = store.insert_batch(&refs).await.unwrap_err();
        assert!(matches!(err, StoreError::Insert(_)));
        assert_eq!(store.summary().await.unwrap().total_records, 0);
    }

    #[tokio::test]
    async fn test_metadata_upsert() {
        let (mut store, _dir) = setup_test_db().await;

        assert_eq!(store.summary().await.unwrap().metadata, None);

        // First run creates the row
        store
            .update_metadata(&MetadataUpdate::for_run(5, 0, Utc::now()))
            .await
            .unwrap();
        let metadata = store.summary().await.unwrap().metadata.unwrap();
        assert_eq!(metadata.total_records_synced, 5);
        assert_eq!(metadata.last_sync_status, Some(SyncStatus::Success));
        assert!(metadata.last_sync_timestamp.is_some());
        assert!(metadata.last_sync_date.is_some());

        // Second run updates in place and accumulates
        store
            .update_metadata(&MetadataUpdate::for_run(3, 2, Utc::now()))
            .await
            .unwrap();
        let metadata = store.summary().await.unwrap().metadata.unwrap();
        assert_eq!(metadata.total_records_synced, 8);
        assert_eq!(metadata.last_sync_status, Some(SyncStatus::Partial));
        assert_eq!(metadata.last_error_message.as_deref(), Some("2 errors"));
    }

    #[tokio::test]
    async fn test_summary_counts_distinct_sites() {
        let (mut store, _dir) = setup_test_db().await;

        let records = [record("a.com", 1), record("a.com", 2), record("b.com", 1)];
        let refs: Vec<&StatusRecord> = records.iter().collect();
        store.insert_batch(&refs).await.unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.distinct_sites, 2);
    }

    #[tokio::test]
    async fn test_missing_table_is_query_error() {
        let dir = tempdir().unwrap();
        let db_url = dir.path().join("empty.db").display().to_string();
        let mut store = DieselStatusStore::connect(&db_url).await.unwrap();

        let sites: BTreeSet<String> = ["a.com".to_string()].into_iter().collect();
        let err = store.existing_keys(&sites).await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
