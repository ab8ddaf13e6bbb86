//! Per-song state machine: search, select, fetch, with bounded attempts.
//!
//! ```text
//! Queued -> Searching -> Fetching -> Done
//!              ^  |          |
//!              |  v          v
//!              +--+----------+   (attempt failed, attempts left)
//!                 |
//!                 v
//!             Abandoned       (attempts exhausted)
//! ```

use std::path::{Path, PathBuf};

use crate::error::{FetchError, SearchError};
use crate::fetch::remove_partial_files;
use crate::scoring;
use crate::search::SortOrder;
use crate::song::Song;
use crate::types::{Event, ExclusionSet, OutcomeStatus, SearchResult, SongOutcome};

use super::SongDownloader;
use super::queue::QueuedSong;
use super::sidecar::{Sidecar, sidecar_for, write_sidecar};

const NOT_FOUND: &str = "no valid video found";

/// Audio file and bitrate of a completed fetch
struct Fetched {
    path: PathBuf,
    bitrate: u32,
}

/// Run one song to completion
///
/// Never fails: every failure is folded into the returned outcome.
pub(super) async fn process_song(downloader: &SongDownloader, item: QueuedSong) -> SongOutcome {
    let QueuedSong {
        id,
        song,
        destination,
    } = item;
    let max_attempts = downloader.config.download.max_attempts;

    let outcome = |attempts: u32, rejected: &ExclusionSet, status: OutcomeStatus| SongOutcome {
        id,
        song: song.clone(),
        destination: destination.clone(),
        attempts,
        rejected_ids: rejected.to_sorted_vec(),
        status,
    };

    if downloader.config.download.skip_existing
        && sidecar_for(&destination, &song).await.is_some()
    {
        tracing::info!(destination = %destination.display(), "Already downloaded, skipping");
        downloader.emit_event(Event::Skipped {
            id,
            destination: destination.clone(),
        });
        return outcome(
            0,
            &ExclusionSet::new(),
            OutcomeStatus::Skipped {
                destination: destination.clone(),
            },
        );
    }

    tracing::info!(destination = %destination.display(), "Working on song");

    let privileged = scoring::privileged_channels(&song, &downloader.config.search.privileged_channels);
    let mut excluded = ExclusionSet::new();
    let mut last_error = String::from(NOT_FOUND);
    let mut attempts = 0;

    while attempts < max_attempts {
        if attempts > 0 && downloader.cancel.is_cancelled() {
            tracing::info!(attempts, "Run cancelled, giving up on song");
            last_error = format!("run cancelled after {} attempts ({})", attempts, last_error);
            break;
        }
        attempts += 1;
        let attempt = attempts;

        downloader.emit_event(Event::Searching { id, attempt });
        let candidate = match find_candidate(downloader, &song, &excluded).await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                tracing::warn!(attempt, song = %song.full_name(), "Unable to find a valid video");
                last_error = NOT_FOUND.to_string();
                downloader.emit_event(Event::AttemptFailed {
                    id,
                    attempt,
                    video_id: None,
                    error: last_error.clone(),
                });
                continue;
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Search failed");
                last_error = e.to_string();
                downloader.emit_event(Event::AttemptFailed {
                    id,
                    attempt,
                    video_id: None,
                    error: last_error.clone(),
                });
                continue;
            }
        };

        let privileged_channel = scoring::is_privileged_channel(&privileged, &candidate);
        tracing::info!(
            attempt,
            video_id = %candidate.id,
            title = %candidate.title,
            channel = %candidate.channel_name,
            privileged_channel,
            "Candidate selected"
        );
        downloader.emit_event(Event::Fetching {
            id,
            attempt,
            video_id: candidate.id.clone(),
            title: candidate.title.clone(),
            privileged_channel,
        });

        match fetch_candidate(downloader, &song, &candidate, &destination).await {
            Ok(Fetched { path, bitrate }) => {
                tracing::info!(path = %path.display(), bitrate, "File downloaded");
                downloader.emit_event(Event::Complete {
                    id,
                    path: path.clone(),
                    bitrate,
                });
                return outcome(
                    attempt,
                    &excluded,
                    OutcomeStatus::Downloaded {
                        path,
                        bitrate,
                        video_id: candidate.id,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(attempt, video_id = %candidate.id, error = %e, "Download failed");
                excluded.insert(candidate.id.clone());
                last_error = e.to_string();
                downloader.emit_event(Event::AttemptFailed {
                    id,
                    attempt,
                    video_id: Some(candidate.id),
                    error: last_error.clone(),
                });
            }
        }
    }

    tracing::error!(attempts, last_error = %last_error, "Giving up on song");
    downloader.emit_event(Event::Abandoned { id, attempts });
    outcome(attempts, &excluded, OutcomeStatus::Abandoned { last_error })
}

/// Open a fresh search for the song and select a candidate
async fn find_candidate(
    downloader: &SongDownloader,
    song: &Song,
    excluded: &ExclusionSet,
) -> Result<Option<SearchResult>, SearchError> {
    let mut session = downloader
        .search
        .open_session(
            &song.full_name(),
            SortOrder::ViewCount,
            downloader.config.search.page_size,
        )
        .await?;
    downloader
        .selector
        .select(song, session.as_mut(), excluded)
        .await
}

/// Fetch the candidate's audio into `destination` and write the sidecar
///
/// The whole fetch is bounded by the configured fetch timeout. A failed or
/// timed out fetch leaves no partial audio file behind.
async fn fetch_candidate(
    downloader: &SongDownloader,
    song: &Song,
    candidate: &SearchResult,
    destination: &Path,
) -> Result<Fetched, FetchError> {
    let timeout = downloader.config.download.fetch_timeout;
    let fetch = async {
        let stream = downloader.fetcher.audio_stream(&candidate.link).await?;
        let bitrate = stream.average_bitrate();
        let path = stream.save(destination).await?;
        let sidecar = Sidecar::for_song(song, bitrate, &candidate.id);
        if let Err(e) = write_sidecar(destination, &sidecar).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }
        Ok::<_, FetchError>(Fetched { path, bitrate })
    };

    let result = match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout { after: timeout }),
    };
    if result.is_err() {
        let removed = remove_partial_files(destination).await;
        if removed > 0 {
            tracing::debug!(removed, "Removed partial download");
        }
    }
    result
}
