//! `info.json` metadata written next to a downloaded song

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::FetchError;
use crate::song::Song;

/// Name of the metadata file inside a song's destination directory
pub const SIDECAR_FILE: &str = "info.json";

/// Metadata recorded after a successful fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    /// Average bitrate of the saved stream in kbps
    pub bitrate: u32,
    /// Id of the video the audio came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Display name of the downloaded song
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song: Option<String>,
    /// Catalog link of the downloaded song
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Sidecar {
    /// Sidecar of `song` downloaded from `video_id`
    pub fn for_song(song: &Song, bitrate: u32, video_id: &str) -> Self {
        Self {
            bitrate,
            video_id: Some(video_id.to_string()),
            song: Some(song.full_name()),
            link: Some(song.link().to_string()),
        }
    }

    /// Whether this sidecar records a download of `song`
    ///
    /// Sidecars that carry no song only describe the song whose expected
    /// filename the directory has (`at_expected_name`).
    pub fn belongs_to(&self, song: &Song, at_expected_name: bool) -> bool {
        match (&self.song, &self.link) {
            (Some(name), Some(link)) => *name == song.full_name() && link == song.link(),
            _ => at_expected_name,
        }
    }
}

/// Write the sidecar into `destination`
pub(crate) async fn write_sidecar(
    destination: &Path,
    sidecar: &Sidecar,
) -> Result<PathBuf, FetchError> {
    let path = destination.join(SIDECAR_FILE);
    let json = serde_json::to_vec(sidecar).map_err(std::io::Error::other)?;
    tokio::fs::write(&path, json).await?;
    Ok(path)
}

/// Read the sidecar of `destination`, if present and readable
pub async fn read_sidecar(destination: &Path) -> Option<Sidecar> {
    let content = tokio::fs::read(destination.join(SIDECAR_FILE)).await.ok()?;
    serde_json::from_slice(&content).ok()
}

/// Sidecar of `destination` if it records a download of `song`
pub(crate) async fn sidecar_for(destination: &Path, song: &Song) -> Option<Sidecar> {
    let at_expected_name = destination
        .file_name()
        .is_some_and(|name| name == song.expected_filename(None).as_str());
    read_sidecar(destination)
        .await
        .filter(|sidecar| sidecar.belongs_to(song, at_expected_name))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn song(name: &str, artists: &[&str], link: &str) -> Song {
        Song::new(name, artists.iter().map(|a| a.to_string()).collect(), link).unwrap()
    }

    #[tokio::test]
    async fn sidecar_holds_bitrate_and_song() {
        let dir = tempfile::tempdir().unwrap();
        let bohemian = song("Bohemian Rhapsody", &["Queen"], "spotify:1");
        assert_eq!(read_sidecar(dir.path()).await, None);

        let sidecar = Sidecar::for_song(&bohemian, 160, "abc");
        let path = write_sidecar(dir.path(), &sidecar).await.unwrap();

        assert_eq!(path, dir.path().join("info.json"));
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["bitrate"], 160);
        assert_eq!(raw["song"], "Queen - Bohemian Rhapsody");
        assert_eq!(raw["link"], "spotify:1");
        assert_eq!(read_sidecar(dir.path()).await, Some(sidecar));
    }

    #[tokio::test]
    async fn sidecar_of_another_song_is_not_claimed() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("A_B_X");
        std::fs::create_dir_all(&destination).unwrap();
        let first = song("X", &["A", "B"], "spotify:1");
        let second = song("X", &["A B"], "spotify:2");

        write_sidecar(&destination, &Sidecar::for_song(&first, 128, "v1"))
            .await
            .unwrap();

        assert!(sidecar_for(&destination, &first).await.is_some());
        assert!(sidecar_for(&destination, &second).await.is_none());
    }

    #[tokio::test]
    async fn bitrate_only_sidecar_belongs_to_the_expected_directory() {
        let dir = tempfile::tempdir().unwrap();
        let bohemian = song("Bohemian Rhapsody", &["Queen"], "spotify:1");
        let expected = dir.path().join("Queen_Bohemian_Rhapsody");
        let suffixed = dir.path().join("Queen_Bohemian_Rhapsody_2");
        for destination in [&expected, &suffixed] {
            std::fs::create_dir_all(destination).unwrap();
            std::fs::write(destination.join("info.json"), r#"{"bitrate": 128}"#).unwrap();
        }

        assert_eq!(
            sidecar_for(&expected, &bohemian).await,
            Some(Sidecar {
                bitrate: 128,
                video_id: None,
                song: None,
                link: None,
            })
        );
        assert_eq!(sidecar_for(&suffixed, &bohemian).await, None);
    }
}
