//! Worker loop: pull songs from the shared queue until it is drained.

use std::sync::Arc;

use tracing::Instrument;

use crate::types::SongOutcome;

use super::SongDownloader;
use super::queue::WorkQueue;
use super::song_task::process_song;

/// Process songs one at a time until the queue is empty, its lock times out,
/// or the run is cancelled
pub(super) async fn run_worker(downloader: SongDownloader, queue: Arc<WorkQueue>) -> Vec<SongOutcome> {
    let pull_timeout = downloader.config.download.queue_pull_timeout;
    let mut outcomes = Vec::new();

    loop {
        if downloader.cancel.is_cancelled() {
            tracing::debug!("Run cancelled, worker stopping");
            break;
        }

        let Some(item) = queue.pull(pull_timeout).await else {
            break;
        };

        let span = tracing::info_span!("song", id = %item.id, song = %item.song.full_name());
        outcomes.push(process_song(&downloader, item).instrument(span).await);
    }

    tracing::debug!(processed = outcomes.len(), "Worker finished");
    outcomes
}
