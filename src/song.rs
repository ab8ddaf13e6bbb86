//! Song model
//!
//! A [`Song`] is an immutable description of a track taken from the catalog.
//! Everything else (search query, scoring name, destination name) is derived
//! from it on demand.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Characters that start a title decoration such as "(Remastered)" or "- Live"
const DECORATION_DELIMITERS: &[char] = &['(', '-'];

/// Artist entry of a catalog record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRecord {
    /// Artist display name
    pub name: String,
}

/// Song record as delivered by the catalog and stored in the songs file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    /// Track title
    pub name: String,
    /// Catalog link of the track
    pub link: String,
    /// Artists in catalog order
    pub artists: Vec<ArtistRecord>,
}

/// A track to locate and download
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Song {
    name: String,
    artists: Vec<String>,
    link: String,
}

impl Song {
    /// Create a song
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSong`] if the name is blank or there are no artists.
    pub fn new(
        name: impl Into<String>,
        artists: Vec<String>,
        link: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidSong("song name is empty".to_string()));
        }
        if artists.is_empty() {
            return Err(Error::InvalidSong(format!("song '{}' has no artists", name)));
        }
        Ok(Self {
            name,
            artists,
            link: link.into(),
        })
    }

    /// Build a song from a catalog record
    pub fn from_record(record: SongRecord) -> Result<Self> {
        let artists = record.artists.into_iter().map(|a| a.name).collect();
        Self::new(record.name, artists, record.link)
    }

    /// Track title as given by the catalog
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Artist names in catalog order
    pub fn artists(&self) -> &[String] {
        &self.artists
    }

    /// Opaque catalog link
    pub fn link(&self) -> &str {
        &self.link
    }

    /// "Artist A, Artist B - Title", used as the search query
    pub fn full_name(&self) -> String {
        format!("{} - {}", self.artists.join(", "), self.name)
    }

    /// Title cut at the earliest decoration delimiter and trimmed
    ///
    /// ```
    /// # use playlist_dl::Song;
    /// let song = Song::new("Song (Remix) - Live", vec!["A".into()], "x").unwrap();
    /// assert_eq!(song.name_without_decorations(), "Song");
    /// ```
    pub fn name_without_decorations(&self) -> &str {
        match self.name.find(DECORATION_DELIMITERS) {
            Some(index) => self.name[..index].trim(),
            None => self.name.trim(),
        }
    }

    /// Filesystem name for this song: artists and title joined by underscores
    ///
    /// Spaces become underscores and "/" is removed. The optional extension is
    /// appended after a dot.
    pub fn expected_filename(&self, extension: Option<&str>) -> String {
        let artists = self.artists.join("_").replace(' ', "_");
        let title = self.name.replace(' ', "_");
        let name = match extension {
            Some(ext) => format!("{}_{}.{}", artists, title, ext),
            None => format!("{}_{}", artists, title),
        };
        name.replace('/', "")
    }
}

impl std::fmt::Display for Song {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<SongRecord> for Song {
    type Error = Error;

    fn try_from(record: SongRecord) -> Result<Self> {
        Self::from_record(record)
    }
}

impl From<&Song> for SongRecord {
    fn from(song: &Song) -> Self {
        Self {
            name: song.name.clone(),
            link: song.link.clone(),
            artists: song
                .artists
                .iter()
                .map(|name| ArtistRecord { name: name.clone() })
                .collect(),
        }
    }
}
