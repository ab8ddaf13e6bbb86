//! Download orchestrator split into focused submodules.
//!
//! - [`queue`] - Shared FIFO and destination assignment
//! - [`worker`] - Worker loop pulling songs from the queue
//! - [`song_task`] - Per-song search/select/fetch state machine
//! - [`sidecar`] - `info.json` metadata next to each download

mod queue;
mod sidecar;
mod song_task;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use sidecar::{SIDECAR_FILE, Sidecar, read_sidecar};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::StreamFetcher;
use crate::search::{SearchProvider, Selector};
use crate::song::Song;
use crate::types::{DownloadReport, Event, OutcomeStatus, SongOutcome};

use self::queue::{QueuedSong, WorkQueue, assign_destinations};

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Downloads the audio of a list of songs with a pool of concurrent workers
/// (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct SongDownloader {
    /// Configuration (wrapped in Arc for sharing across workers)
    pub(crate) config: Arc<Config>,
    /// Video search collaborator
    pub(crate) search: Arc<dyn SearchProvider>,
    /// Audio stream collaborator
    pub(crate) fetcher: Arc<dyn StreamFetcher>,
    /// Candidate selection built from the search configuration
    pub(crate) selector: Arc<Selector>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Stops workers from pulling further songs
    pub(crate) cancel: CancellationToken,
}

impl SongDownloader {
    /// Create a downloader over the given collaborators
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(
        config: Config,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn StreamFetcher>,
    ) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            selector: Arc::new(Selector::new(&config.search)),
            config: Arc::new(config),
            search,
            fetcher,
            event_tx,
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to lifecycle events of every song
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the run when cancelled
    ///
    /// Workers stop pulling new songs; a song in progress finishes its current
    /// attempt. Songs still queued are reported as cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Download every song and report what happened to each
    ///
    /// Every song is processed by exactly one worker. Per-song failures are
    /// recorded in the report; only failing to prepare the destination
    /// directory is an error.
    pub async fn download_all(&self, songs: Vec<Song>) -> Result<DownloadReport> {
        let destination_dir = &self.config.download.destination_dir;
        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create destination directory '{}': {}",
                        destination_dir.display(),
                        e
                    ),
                ))
            })?;

        let items = assign_destinations(destination_dir, songs).await;
        for item in &items {
            self.emit_event(Event::Queued {
                id: item.id,
                name: item.song.full_name(),
                destination: item.destination.clone(),
            });
        }
        let queued: HashMap<_, _> = items.iter().map(|item| (item.id, item.clone())).collect();
        let queue = Arc::new(WorkQueue::new(items));

        let worker_count = self.config.download.worker_count().min(queued.len().max(1));
        tracing::info!(
            songs = queued.len(),
            workers = worker_count,
            destination = %destination_dir.display(),
            "Starting download"
        );

        let handles: Vec<_> = (0..worker_count)
            .map(|n| {
                let span = tracing::info_span!("worker", worker = n);
                tokio::spawn(worker::run_worker(self.clone(), Arc::clone(&queue)).instrument(span))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(queued.len());
        for handle in handles {
            match handle.await {
                Ok(worker_outcomes) => outcomes.extend(worker_outcomes),
                Err(e) => tracing::error!(error = %e, "Worker task failed"),
            }
        }

        for item in queue.drain().await {
            if !self.cancel.is_cancelled() {
                tracing::warn!(id = %item.id, "Song left in queue after workers stopped");
            }
            outcomes.push(unprocessed(item, OutcomeStatus::Cancelled));
        }

        // Songs lost with a failed worker task still get an outcome
        let reported: std::collections::HashSet<_> = outcomes.iter().map(|o| o.id).collect();
        for (id, item) in queued {
            if !reported.contains(&id) {
                outcomes.push(unprocessed(
                    item,
                    OutcomeStatus::Abandoned {
                        last_error: "worker task failed".to_string(),
                    },
                ));
            }
        }

        outcomes.sort_by_key(|outcome| outcome.id);
        let report = DownloadReport { outcomes };
        tracing::info!(
            downloaded = report.downloaded(),
            skipped = report.skipped(),
            abandoned = report.abandoned(),
            cancelled = report.cancelled(),
            "Download finished"
        );
        Ok(report)
    }
}

fn unprocessed(item: QueuedSong, status: OutcomeStatus) -> SongOutcome {
    SongOutcome {
        id: item.id,
        song: item.song,
        destination: item.destination,
        attempts: 0,
        rejected_ids: Vec::new(),
        status,
    }
}
