//! Deduplicating sync pipeline.
//!
//! The orchestrator pages through a [`RecordSource`](crate::source::RecordSource),
//! hands each page to the batch writer, and records the run in the metadata
//! row when paging ends.

mod metadata;
mod orchestrator;
mod writer;

pub use metadata::MetadataTracker;
pub use orchestrator::{SyncMode, SyncOrchestrator, SyncOutcome, SyncPhase};
pub use writer::BatchWriter;
