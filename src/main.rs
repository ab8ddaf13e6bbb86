//! playlist-dl command line
//!
//! Loads the playlist (songs file, or Spotify when the file does not exist
//! yet), then downloads every song through an Invidious instance.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use playlist_dl::catalog::{self, SpotifyClient};
use playlist_dl::{
    CatalogError, Config, DownloadReport, InvidiousClient, OutcomeStatus, Result, Song,
    SongDownloader, download_with_shutdown,
};

const DEFAULT_LOG_FILTER: &str = "playlist_dl=info";

/// Download the audio of a playlist's songs
#[derive(Debug, Parser)]
#[command(name = "playlist-dl", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Songs file to read, or to create from the playlist when missing
    #[arg(long)]
    songs_file: Option<PathBuf>,

    /// Directory receiving one sub-directory per song
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Spotify playlist id
    #[arg(long, env = "SPOTIFY_PLAYLIST_ID")]
    playlist: Option<String>,

    /// Spotify client id
    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    client_id: Option<String>,

    /// Spotify client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Invidious instance used for search and streams
    #[arg(long, env = "INVIDIOUS_URL")]
    invidious: Option<String>,

    /// Also write logs (without colors) to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Configuration file (or defaults) with command line overrides applied
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };

        if let Some(songs_file) = &self.songs_file {
            config.catalog.songs_file = songs_file.clone();
        }
        if let Some(destination) = &self.destination {
            config.download.destination_dir = destination.clone();
        }
        if self.workers.is_some() {
            config.download.workers = self.workers;
        }
        if self.playlist.is_some() {
            config.catalog.playlist_id = self.playlist.clone();
        }
        if self.client_id.is_some() {
            config.catalog.client_id = self.client_id.clone();
        }
        if self.client_secret.is_some() {
            config.catalog.client_secret = self.client_secret.clone();
        }
        if let Some(url) = &self.invidious {
            config.invidious.base_url = url.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(log_file: Option<&PathBuf>) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Songs from the songs file, fetching the playlist first if the file is missing
async fn load_songs(config: &Config) -> Result<Vec<Song>> {
    let songs_file = &config.catalog.songs_file;
    if tokio::fs::try_exists(songs_file).await.unwrap_or(false) {
        tracing::info!(path = %songs_file.display(), "Reading songs file");
        return catalog::load_songs(songs_file).await;
    }

    let playlist_id = config
        .catalog
        .playlist_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CatalogError::MissingCredentials("playlist_id".to_string()))?;

    tracing::info!(playlist_id, "Songs file not found, fetching playlist");
    let spotify = SpotifyClient::new(&config.catalog, &config.retry)?;
    let records = spotify.playlist_tracks(playlist_id).await?;
    catalog::store_songs_file(songs_file, &records).await?;
    Ok(catalog::songs_from_records(records))
}

fn print_summary(report: &DownloadReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            OutcomeStatus::Downloaded { path, bitrate, .. } => {
                println!("  ok        {} ({} kbps) -> {}", outcome.song, bitrate, path.display())
            }
            OutcomeStatus::Skipped { .. } => println!("  skipped   {}", outcome.song),
            OutcomeStatus::Abandoned { last_error } => println!(
                "  FAILED    {} after {} attempts: {}",
                outcome.song, outcome.attempts, last_error
            ),
            OutcomeStatus::Cancelled => println!("  cancelled {}", outcome.song),
        }
    }
    println!(
        "{} downloaded, {} skipped, {} failed, {} cancelled",
        report.downloaded(),
        report.skipped(),
        report.abandoned(),
        report.cancelled()
    );
}

async fn run(cli: Cli) -> Result<DownloadReport> {
    let config = cli.load_config()?;
    let songs = load_songs(&config).await?;

    let invidious = Arc::new(InvidiousClient::new(&config.invidious)?);
    tracing::info!(
        invidious = invidious.base_url(),
        songs = songs.len(),
        "Playlist ready"
    );

    let downloader = SongDownloader::new(config, invidious.clone(), invidious)?;
    download_with_shutdown(&downloader, songs).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_file.as_ref()) {
        eprintln!("playlist-dl: cannot open log file: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(report) => {
            print_summary(&report);
            if report.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "playlist-dl failed");
            eprintln!("playlist-dl: {}", e);
            ExitCode::FAILURE
        }
    }
}
