//! # playlist-dl
//!
//! Finds, ranks and downloads the audio of playlist songs from a video search
//! index.
//!
//! ## Design Philosophy
//!
//! playlist-dl is designed to be:
//! - **Pluggable** - Search and streaming are traits; Invidious is the bundled implementation
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Library-first** - The CLI is a thin layer over [`SongDownloader`]
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use playlist_dl::{Config, InvidiousClient, Song, SongDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let invidious = Arc::new(InvidiousClient::new(&config.invidious)?);
//!     let downloader = SongDownloader::new(config, invidious.clone(), invidious)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let songs = vec![Song::new("Bohemian Rhapsody", vec!["Queen".into()], "x")?];
//!     let report = downloader.download_all(songs).await?;
//!     println!("{} downloaded", report.downloaded());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Playlist catalog: songs file and Spotify source
pub mod catalog;
/// Configuration types
pub mod config;
/// Download orchestrator (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Audio stream traits
pub mod fetch;
/// Invidious search and stream client
pub mod invidious;
/// Retry logic with exponential backoff
pub mod retry;
/// Candidate scoring rules
pub mod scoring;
/// Search session traits and candidate selection
pub mod search;
/// Song model and catalog records
pub mod song;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use catalog::SpotifyClient;
pub use config::{Config, SelectionStrategy};
pub use downloader::SongDownloader;
pub use error::{CatalogError, Error, FetchError, Result, SearchError};
pub use fetch::{AudioStream, StreamFetcher};
pub use invidious::InvidiousClient;
pub use search::{SearchProvider, SearchSession, Selector, SortOrder};
pub use song::{ArtistRecord, Song, SongRecord};
pub use types::{
    DownloadReport, Event, ExclusionSet, OutcomeStatus, SearchResult, SongId, SongOutcome,
    SongState,
};

/// Download songs, cancelling the run on a termination signal.
///
/// On SIGTERM/SIGINT (Ctrl+C elsewhere) workers stop pulling new songs, songs
/// in progress finish their current attempt, and the remaining ones are
/// reported as cancelled.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use playlist_dl::{Config, InvidiousClient, SongDownloader, download_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let invidious = Arc::new(InvidiousClient::new(&config.invidious)?);
///     let downloader = SongDownloader::new(config, invidious.clone(), invidious)?;
///
///     let report = download_with_shutdown(&downloader, Vec::new()).await?;
///     assert!(report.is_complete());
///     Ok(())
/// }
/// ```
pub async fn download_with_shutdown(
    downloader: &SongDownloader,
    songs: Vec<Song>,
) -> Result<DownloadReport> {
    let token = downloader.cancellation_token();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_signal() => {
                    tracing::warn!("Stopping: finishing songs in progress, remaining songs are cancelled");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        })
    };

    let report = downloader.download_all(songs).await;
    watcher.abort();
    report
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for Ctrl+C only");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C");
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            // Never cancel the run if signals cannot be observed
            std::future::pending::<()>().await;
        }
    }
}
