//! Audio stream retrieval
//!
//! A [`StreamFetcher`] resolves a candidate's link to an audio-only
//! [`AudioStream`], which can then be saved under a destination directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Suffix of an audio file still being written
pub const PARTIAL_SUFFIX: &str = ".part";

/// Where `path` is written before it is complete
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Delete unfinished audio files left in `destination`
///
/// Returns how many files were removed.
pub async fn remove_partial_files(destination: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(destination).await else {
        return 0;
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let is_partial = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(PARTIAL_SUFFIX));
        if !is_partial {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(
                path = %entry.path().display(),
                error = %e,
                "Could not remove partial download"
            ),
        }
    }
    removed
}

/// Audio-only stream of a video
#[async_trait]
pub trait AudioStream: Send + Sync {
    /// Average bitrate in kbps
    fn average_bitrate(&self) -> u32;

    /// Write the stream into `destination` (created if missing)
    ///
    /// Returns the path of the written file. Data goes to
    /// [`partial_path`] first and is moved in place once complete.
    async fn save(&self, destination: &Path) -> Result<PathBuf, FetchError>;
}

/// Source of audio streams
#[async_trait]
pub trait StreamFetcher: Send + Sync {
    /// Resolve the candidate link to its best audio-only stream
    async fn audio_stream(&self, link: &str) -> Result<Box<dyn AudioStream>, FetchError>;
}
