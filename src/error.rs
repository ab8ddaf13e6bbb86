//! Error types for playlist-dl
//!
//! The crate-level [`Error`] wraps the collaborator-specific errors:
//! - [`SearchError`] for the paginated video search
//! - [`FetchError`] for audio stream retrieval and storage
//! - [`CatalogError`] for the playlist catalog and the songs file
//!
//! Per-song failures inside the orchestrator are never returned as `Err`;
//! they are recorded in the song's outcome instead.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for playlist-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlist-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// A song could not be built from catalog data
    #[error("invalid song: {0}")]
    InvalidSong(String),

    /// Video search failed
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Audio fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Catalog (playlist source or songs file) failed
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error on a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Errors raised by a search session
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request could not be sent or the connection failed
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The index answered with a non-success status
    #[error("search index returned status {status}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
    },

    /// The response body could not be interpreted
    #[error("could not decode search results: {0}")]
    Decode(String),
}

/// Errors raised while fetching an audio stream
#[derive(Debug, Error)]
pub enum FetchError {
    /// The candidate link does not identify a video
    #[error("invalid video link: {link}")]
    InvalidLink {
        /// The offending link
        link: String,
    },

    /// The video exists in search but cannot be streamed (removed, private, geo-blocked, ...)
    #[error("video {video_id} is unavailable: {reason}")]
    Unavailable {
        /// External video identifier
        video_id: String,
        /// Reason reported by the source
        reason: String,
    },

    /// The video has no audio-only stream
    #[error("video {video_id} has no audio-only stream")]
    NoAudioStream {
        /// External video identifier
        video_id: String,
    },

    /// The fetch did not finish in time
    #[error("fetch timed out after {after:?}")]
    Timeout {
        /// Configured bound that was exceeded
        after: Duration,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the stream or its sidecar failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the catalog source
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Client id, secret or playlist id not configured
    #[error("missing catalog credentials: {0}")]
    MissingCredentials(String),

    /// The token endpoint refused the credentials
    #[error("authentication failed with status {status}")]
    Authentication {
        /// HTTP status code
        status: u16,
    },

    /// A catalog endpoint answered with a non-success status
    #[error("catalog request to {url} returned status {status}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The songs file could not be read or parsed
    #[error("invalid songs file {path}: {reason}")]
    InvalidSongsFile {
        /// Path of the songs file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A record does not describe a usable song
    #[error("invalid catalog record: {reason}")]
    InvalidRecord {
        /// What went wrong
        reason: String,
    },
}
