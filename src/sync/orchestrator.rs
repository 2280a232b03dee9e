//! Sync run driver: connect, page through the source, finalize, close.

use std::time::Duration;

use tracing::{debug, error, info};

use super::metadata::MetadataTracker;
use super::writer::BatchWriter;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::RunStatistics;
use crate::repository::{StatusStore, StoreConnector, StoreSummary};
use crate::source::RecordSource;

/// How the run was requested. Both modes traverse the whole remote set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    Full,
    #[default]
    Incremental,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Connecting,
    Paging,
    Finalizing,
    Closed,
}

/// Result of one run.
#[derive(Debug)]
pub struct SyncOutcome {
    pub mode: SyncMode,
    pub dry_run: bool,
    pub stats: RunStatistics,
    /// Store totals queried after the run, if the query succeeded.
    pub summary: Option<StoreSummary>,
    pub fatal: Option<SyncError>,
}

impl SyncOutcome {
    /// True when the run closed without a fatal error or a failed insert.
    pub fn success(&self) -> bool {
        self.fatal.is_none() && !self.stats.has_insert_errors()
    }
}

/// Drives one sync run against a store connector and a record source.
pub struct SyncOrchestrator<C, S> {
    connector: C,
    source: S,
    page_size: usize,
    page_delay: Duration,
    dry_run: bool,
    mode: SyncMode,
    writer: BatchWriter,
    tracker: MetadataTracker,
    phase: SyncPhase,
}

impl<C, S> SyncOrchestrator<C, S>
where
    C: StoreConnector,
    S: RecordSource,
{
    pub fn new(config: &SyncConfig, connector: C, source: S) -> Self {
        Self {
            connector,
            source,
            page_size: config.page_size,
            page_delay: config.page_delay,
            dry_run: config.dry_run,
            mode: config.mode,
            writer: BatchWriter::new(config.dry_run),
            tracker: MetadataTracker::new(config.dry_run),
            phase: SyncPhase::Idle,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Run the sync to completion. Never panics on I/O failure; fatal errors
    /// are reported in the outcome.
    pub async fn run(&mut self) -> SyncOutcome {
        info!(
            "Starting {} sync{}",
            self.mode.as_str(),
            if self.dry_run { " (dry run)" } else { "" }
        );

        let mut outcome = SyncOutcome {
            mode: self.mode,
            dry_run: self.dry_run,
            stats: RunStatistics::default(),
            summary: None,
            fatal: None,
        };

        self.enter(SyncPhase::Connecting);
        let target = self.connector.describe();
        let mut store = match self.connector.connect().await {
            Ok(store) => store,
            Err(e) => {
                error!("Cannot connect to {}: {}", target, e);
                outcome.fatal = Some(SyncError::Connection(e));
                self.enter(SyncPhase::Closed);
                return outcome;
            }
        };
        info!("Connected to {}", target);

        self.enter(SyncPhase::Paging);
        self.page_through(&mut store, &mut outcome.stats).await;

        self.enter(SyncPhase::Finalizing);
        outcome.summary = self.finalize(&mut store, &outcome.stats).await;

        // The store's Drop releases the connection, also when unwinding.
        drop(store);
        info!("Connection to {} closed", target);
        self.enter(SyncPhase::Closed);

        outcome
    }

    async fn page_through(&self, store: &mut C::Store, stats: &mut RunStatistics) {
        let mut offset = 0;

        loop {
            let page = match self.source.fetch(self.page_size, offset).await {
                Ok(page) => page,
                Err(e) => {
                    error!("Fetch at offset {} failed, ending pagination: {}", offset, e);
                    break;
                }
            };

            if page.is_empty() {
                debug!("Empty page at offset {}, source exhausted", offset);
                break;
            }

            stats.pages += 1;
            stats.total_fetched += page.raw_len as u64;
            stats.malformed += page.malformed as u64;
            info!("Batch {}: {} records", stats.pages, page.raw_len);

            *stats += self.writer.write(store, &page.records).await;

            if page.is_last(self.page_size) {
                debug!(
                    "Short page ({} < {}), source exhausted",
                    page.raw_len, self.page_size
                );
                break;
            }

            offset += self.page_size;
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }
    }

    async fn finalize(
        &self,
        store: &mut C::Store,
        stats: &RunStatistics,
    ) -> Option<StoreSummary> {
        // Failure is already logged by the tracker and does not fail the run.
        let _ = self
            .tracker
            .update_metadata(store, stats.new_records, stats.errors)
            .await;

        match store.summary().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Failed to read store statistics: {}", e);
                None
            }
        }
    }

    fn enter(&mut self, phase: SyncPhase) {
        debug!("Sync phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}
