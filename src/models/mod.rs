//! Domain models.

mod stats;
mod status_record;
mod sync_metadata;

pub use stats::RunStatistics;
pub use status_record::{RecordKey, StatusRecord};
pub use sync_metadata::{MetadataUpdate, SyncMetadata, SyncStatus, SYNC_METADATA_ID};
