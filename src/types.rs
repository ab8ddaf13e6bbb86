//! Core types and events for playlist-dl

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::song::Song;

/// Identifier of a song within one download run (its position in the queue)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub u64);

impl std::fmt::Display for SongId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A search hit considered as a possible match for a song
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stable external identifier
    pub id: String,
    /// Video title
    pub title: String,
    /// Uploading channel
    pub channel_name: String,
    /// Human-readable view count ("1,234 views", "No views"); `None` when unknown
    pub view_count_text: Option<String>,
    /// Opaque target handed to the stream fetcher
    pub link: String,
}

/// Candidate ids rejected for one song across its attempts
///
/// Grows monotonically while the song is being processed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: HashSet<String>,
}

impl ExclusionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rejected id; returns false if it was already present
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    /// Whether the id was rejected before
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of rejected ids
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if nothing was rejected yet
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rejected ids in sorted order
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Processing state of a single song
///
/// `Searching` and `Fetching` only exist while a song is in progress; they are
/// observed through [`Event::state`]. A finished song is `Done` or `Abandoned`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongState {
    /// Waiting in the shared queue
    Queued,
    /// Looking for an acceptable candidate
    Searching,
    /// Downloading the selected candidate's audio
    Fetching,
    /// Audio and sidecar written
    Done,
    /// Attempts exhausted without success
    Abandoned,
}

/// Event emitted by the downloader
///
/// Subscribe with [`SongDownloader::subscribe`](crate::SongDownloader::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Song added to the queue
    Queued {
        /// Song ID
        id: SongId,
        /// Search query / display name
        name: String,
        /// Directory assigned to the song
        destination: PathBuf,
    },

    /// An attempt started searching
    Searching {
        /// Song ID
        id: SongId,
        /// Attempt number, starting at 1
        attempt: u32,
    },

    /// A candidate was selected and is being fetched
    Fetching {
        /// Song ID
        id: SongId,
        /// Attempt number, starting at 1
        attempt: u32,
        /// Selected candidate id
        video_id: String,
        /// Selected candidate title
        title: String,
        /// Whether the candidate's channel is a privileged one
        privileged_channel: bool,
    },

    /// An attempt ended without a download
    AttemptFailed {
        /// Song ID
        id: SongId,
        /// Attempt number, starting at 1
        attempt: u32,
        /// Candidate that failed, if one had been selected
        #[serde(skip_serializing_if = "Option::is_none")]
        video_id: Option<String>,
        /// Failure cause
        error: String,
    },

    /// Song downloaded
    Complete {
        /// Song ID
        id: SongId,
        /// Path of the audio file
        path: PathBuf,
        /// Average bitrate in kbps
        bitrate: u32,
    },

    /// Song already present at its destination
    Skipped {
        /// Song ID
        id: SongId,
        /// Existing destination
        destination: PathBuf,
    },

    /// Song given up after exhausting its attempts
    Abandoned {
        /// Song ID
        id: SongId,
        /// Attempts consumed
        attempts: u32,
    },
}

impl Event {
    /// Song the event is about
    pub fn id(&self) -> SongId {
        match self {
            Event::Queued { id, .. }
            | Event::Searching { id, .. }
            | Event::Fetching { id, .. }
            | Event::AttemptFailed { id, .. }
            | Event::Complete { id, .. }
            | Event::Skipped { id, .. }
            | Event::Abandoned { id, .. } => *id,
        }
    }

    /// State the song enters with this event
    ///
    /// `None` for a failed attempt: the song stays where it is until the next
    /// attempt starts searching or it is abandoned.
    pub fn state(&self) -> Option<SongState> {
        match self {
            Event::Queued { .. } => Some(SongState::Queued),
            Event::Searching { .. } => Some(SongState::Searching),
            Event::Fetching { .. } => Some(SongState::Fetching),
            Event::AttemptFailed { .. } => None,
            Event::Complete { .. } | Event::Skipped { .. } => Some(SongState::Done),
            Event::Abandoned { .. } => Some(SongState::Abandoned),
        }
    }
}

/// Final status of a song
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Audio downloaded and sidecar written
    Downloaded {
        /// Path of the audio file
        path: PathBuf,
        /// Average bitrate in kbps
        bitrate: u32,
        /// Id of the candidate that was downloaded
        video_id: String,
    },
    /// Destination already held a finished download
    Skipped {
        /// Existing destination
        destination: PathBuf,
    },
    /// Attempts exhausted
    Abandoned {
        /// Cause of the last failed attempt
        last_error: String,
    },
    /// Never started because the run was cancelled
    Cancelled,
}

/// What happened to one song
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SongOutcome {
    /// Song ID within the run
    pub id: SongId,
    /// The song itself
    pub song: Song,
    /// Directory assigned to the song
    pub destination: PathBuf,
    /// Attempts consumed
    pub attempts: u32,
    /// Candidate ids rejected after failed fetches
    pub rejected_ids: Vec<String>,
    /// Final status
    pub status: OutcomeStatus,
}

impl SongOutcome {
    /// Final state in terms of the per-song state machine
    pub fn state(&self) -> SongState {
        match self.status {
            OutcomeStatus::Downloaded { .. } | OutcomeStatus::Skipped { .. } => SongState::Done,
            OutcomeStatus::Abandoned { .. } => SongState::Abandoned,
            OutcomeStatus::Cancelled => SongState::Queued,
        }
    }
}

/// Per-song results of a download run, ordered by [`SongId`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DownloadReport {
    /// One entry per queued song
    pub outcomes: Vec<SongOutcome>,
}

impl DownloadReport {
    /// Songs downloaded in this run
    pub fn downloaded(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Downloaded { .. }))
    }

    /// Songs skipped because they were already present
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped { .. }))
    }

    /// Songs abandoned after exhausting attempts
    pub fn abandoned(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Abandoned { .. }))
    }

    /// Songs never started because of cancellation
    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Cancelled))
    }

    /// True when every song ended downloaded or skipped
    pub fn is_complete(&self) -> bool {
        self.downloaded() + self.skipped() == self.outcomes.len()
    }

    fn count(&self, predicate: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}
