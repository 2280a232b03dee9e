//! status-sync - incremental, deduplicating copy of status-check records from
//! a paginated HTTP dump into a relational table.

// as_str/from_str pairs on enums mirror the stored column values
#![allow(clippy::should_implement_trait)]

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod schema;
pub mod source;
pub mod sync;

pub use config::SyncConfig;
pub use error::{ParseError, SourceError, StoreError, SyncError};
pub use models::{RunStatistics, StatusRecord};
pub use sync::{SyncMode, SyncOrchestrator, SyncOutcome};
