//! Playlist catalog
//!
//! Songs come either from the intermediate songs file (`{"root": [...]}`) or
//! from a Spotify playlist via [`SpotifyClient`]. A fetched playlist is stored
//! in the songs file so later runs can skip the catalog entirely.

mod spotify;

pub use spotify::SpotifyClient;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CatalogError, Result};
use crate::song::{Song, SongRecord};

/// On-disk layout of the songs file
#[derive(Debug, Default, Serialize, Deserialize)]
struct SongsFile {
    root: Vec<SongRecord>,
}

/// Read all records of a songs file
///
/// # Errors
///
/// Returns [`CatalogError::InvalidSongsFile`] if the file cannot be read or is
/// not a `{"root": [...]}` document.
pub async fn load_songs_file(path: &Path) -> Result<Vec<SongRecord>> {
    let invalid = |reason: String| CatalogError::InvalidSongsFile {
        path: path.to_path_buf(),
        reason,
    };

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| invalid(e.to_string()))?;
    let file: SongsFile = serde_json::from_slice(&content).map_err(|e| invalid(e.to_string()))?;

    tracing::debug!(path = %path.display(), records = file.root.len(), "Songs file loaded");
    Ok(file.root)
}

/// Write records to a songs file (pretty-printed, replacing any previous content)
pub async fn store_songs_file(path: &Path, records: &[SongRecord]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = SongsFile {
        root: records.to_vec(),
    };
    let json = serde_json::to_vec_pretty(&file)?;
    tokio::fs::write(path, json).await?;

    tracing::info!(path = %path.display(), records = records.len(), "Songs file written");
    Ok(())
}

/// Turn catalog records into songs
///
/// Records that do not describe a usable song (blank title, no artists) are
/// logged and left out.
pub fn songs_from_records(records: Vec<SongRecord>) -> Vec<Song> {
    records
        .into_iter()
        .filter_map(|record| {
            let link = record.link.clone();
            match Song::from_record(record) {
                Ok(song) => Some(song),
                Err(e) => {
                    tracing::warn!(link = %link, error = %e, "Skipping catalog record");
                    None
                }
            }
        })
        .collect()
}

/// Load the songs of a songs file
pub async fn load_songs(path: &Path) -> Result<Vec<Song>> {
    Ok(songs_from_records(load_songs_file(path).await?))
}
