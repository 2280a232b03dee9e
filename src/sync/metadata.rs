//! Sync metadata tracking.

use chrono::Utc;
use tracing::{error, info};

use crate::error::StoreResult;
use crate::models::MetadataUpdate;
use crate::repository::StatusStore;

/// Records the outcome of each run in the singleton metadata row.
#[derive(Debug, Clone, Copy)]
pub struct MetadataTracker {
    dry_run: bool,
}

impl MetadataTracker {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Write last-sync time, status and the cumulative count. Skipped in dry
    /// run. Returns the update that was (or would have been) written.
    pub async fn update_metadata<S>(
        &self,
        store: &mut S,
        new_records: u64,
        error_count: u64,
    ) -> StoreResult<MetadataUpdate>
    where
        S: StatusStore + ?Sized,
    {
        let update = MetadataUpdate::for_run(new_records, error_count, Utc::now());

        if self.dry_run {
            info!("[dry run] Sync metadata not updated");
            return Ok(update);
        }

        match store.update_metadata(&update).await {
            Ok(()) => {
                info!(
                    "Sync metadata updated (status={}, +{} records)",
                    update.status.as_str(),
                    new_records
                );
                Ok(update)
            }
            Err(e) => {
                error!("Failed to update sync metadata: {}", e);
                Err(e)
            }
        }
    }
}
