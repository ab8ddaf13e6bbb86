//! Shared FIFO of songs waiting for a worker

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::song::Song;
use crate::types::SongId;
use crate::utils::unique_name_candidates;

use super::sidecar::{Sidecar, read_sidecar};

/// A song with its position in the run and its destination directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QueuedSong {
    pub(crate) id: SongId,
    pub(crate) song: Song,
    pub(crate) destination: PathBuf,
}

/// Give every song an id and a destination under `destination_dir`
///
/// A song keeps the directory whose sidecar records an earlier download of
/// it. Every other song gets the first of its expected filename, `_2`, `_3`,
/// ... that is neither assigned in this run nor holds another song's
/// download.
pub(crate) async fn assign_destinations(
    destination_dir: &Path,
    songs: Vec<Song>,
) -> Vec<QueuedSong> {
    let mut existing = ExistingSidecars::new(destination_dir);
    let mut taken = HashSet::with_capacity(songs.len());
    let mut names: Vec<Option<String>> = vec![None; songs.len()];

    // Directories already downloaded for a song stay with it
    for (index, song) in songs.iter().enumerate() {
        let expected = song.expected_filename(None);
        for (n, name) in unique_name_candidates(&expected).enumerate() {
            let Some(sidecar) = existing.get(&name).await else {
                break;
            };
            if !taken.contains(&name) && sidecar.belongs_to(song, n == 0) {
                taken.insert(name.clone());
                names[index] = Some(name);
                break;
            }
        }
    }

    for (index, song) in songs.iter().enumerate() {
        if names[index].is_some() {
            continue;
        }
        let expected = song.expected_filename(None);
        for (n, name) in unique_name_candidates(&expected).enumerate() {
            if taken.contains(&name) {
                continue;
            }
            let foreign = existing
                .get(&name)
                .await
                .is_some_and(|sidecar| !sidecar.belongs_to(song, n == 0));
            if !foreign {
                taken.insert(name.clone());
                names[index] = Some(name);
                break;
            }
        }
    }

    songs
        .into_iter()
        .zip(names)
        .enumerate()
        .map(|(index, (song, name))| {
            let expected = song.expected_filename(None);
            let name = name.unwrap_or_else(|| expected.clone());
            if name != expected {
                tracing::warn!(
                    song = %song.full_name(),
                    expected = %expected,
                    assigned = %name,
                    "Destination already used by another song, disambiguating"
                );
            }
            QueuedSong {
                id: SongId(index as u64),
                destination: destination_dir.join(name),
                song,
            }
        })
        .collect()
}

/// Sidecars found under the destination directory, read at most once each
struct ExistingSidecars<'a> {
    destination_dir: &'a Path,
    cache: HashMap<String, Option<Sidecar>>,
}

impl<'a> ExistingSidecars<'a> {
    fn new(destination_dir: &'a Path) -> Self {
        Self {
            destination_dir,
            cache: HashMap::new(),
        }
    }

    async fn get(&mut self, name: &str) -> Option<Sidecar> {
        if let Some(cached) = self.cache.get(name) {
            return cached.clone();
        }
        let sidecar = read_sidecar(&self.destination_dir.join(name)).await;
        self.cache.insert(name.to_string(), sidecar.clone());
        sidecar
    }
}

/// FIFO shared by all workers of a run
pub(crate) struct WorkQueue {
    pub(crate) items: Mutex<VecDeque<QueuedSong>>,
}

impl WorkQueue {
    pub(crate) fn new(items: impl IntoIterator<Item = QueuedSong>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
        }
    }

    /// Take the next song
    ///
    /// `None` when the queue is empty or its lock could not be obtained within
    /// `timeout`; either way the caller treats the queue as drained.
    pub(crate) async fn pull(&self, timeout: Duration) -> Option<QueuedSong> {
        match tokio::time::timeout(timeout, self.items.lock()).await {
            Ok(mut items) => items.pop_front(),
            Err(_) => {
                tracing::debug!(timeout_ms = timeout.as_millis(), "Queue pull timed out");
                None
            }
        }
    }

    /// Remove and return everything still queued
    pub(crate) async fn drain(&self) -> Vec<QueuedSong> {
        self.items.lock().await.drain(..).collect()
    }
}
