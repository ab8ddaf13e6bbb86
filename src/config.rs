//! Configuration types for playlist-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Download behavior configuration (destination, worker pool, attempt bounds)
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory receiving one sub-directory per song (default: "songs")
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,

    /// Number of concurrent workers (default: available processing units)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Search-then-fetch attempts per song before it is abandoned (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How long a worker waits on the shared queue before treating it as empty (default: 500ms)
    #[serde(default = "default_queue_pull_timeout", with = "duration_millis")]
    pub queue_pull_timeout: Duration,

    /// Upper bound on a single stream fetch, including the sidecar write (default: 300s)
    #[serde(default = "default_fetch_timeout", with = "duration_millis")]
    pub fetch_timeout: Duration,

    /// Treat a destination that already holds `info.json` as done (default: true)
    #[serde(default = "default_true")]
    pub skip_existing: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            destination_dir: default_destination_dir(),
            workers: None,
            max_attempts: default_max_attempts(),
            queue_pull_timeout: default_queue_pull_timeout(),
            fetch_timeout: default_fetch_timeout(),
            skip_existing: true,
        }
    }
}

impl DownloadConfig {
    /// Effective worker count
    ///
    /// Falls back to the number of available processing units, or 1 if that
    /// cannot be determined.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// How a page of search results is turned into a single candidate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Take the first acceptable candidate of the page (default)
    #[default]
    FirstAcceptable,
    /// Rank every acceptable candidate of the page and take the winner
    BestOnPage,
}

/// Candidate search and scoring configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results requested per page (default: 10)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of page advances per selection (default: 20)
    #[serde(default = "default_max_page_advances")]
    pub max_page_advances: u32,

    /// Minimum title match ratio, inclusive (default: 0.5)
    #[serde(default = "default_acceptability_threshold")]
    pub acceptability_threshold: f64,

    /// Words that disqualify a title, matched case-insensitively (default: COVER, VOCAL)
    #[serde(default = "default_rejected_title_words")]
    pub rejected_title_words: Vec<String>,

    /// Channels trusted in addition to the song's own artists (default: Vevo)
    #[serde(default = "default_privileged_channels")]
    pub privileged_channels: Vec<String>,

    /// Selection strategy within a page
    #[serde(default)]
    pub strategy: SelectionStrategy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_advances: default_max_page_advances(),
            acceptability_threshold: default_acceptability_threshold(),
            rejected_title_words: default_rejected_title_words(),
            privileged_channels: default_privileged_channels(),
            strategy: SelectionStrategy::default(),
        }
    }
}

/// Invidious instance used for search and stream retrieval
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvidiousConfig {
    /// Base URL of the instance, without trailing slash
    #[serde(default = "default_invidious_url")]
    pub base_url: String,

    /// Timeout applied to every HTTP request (default: 30s)
    #[serde(default = "default_request_timeout", with = "duration_millis")]
    pub request_timeout: Duration,
}

impl Default for InvidiousConfig {
    fn default() -> Self {
        Self {
            base_url: default_invidious_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Playlist catalog configuration (Spotify and the intermediate songs file)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Intermediate songs file; reused instead of querying the catalog when present
    #[serde(default = "default_songs_file")]
    pub songs_file: PathBuf,

    /// Where the access token is cached between runs
    #[serde(default = "default_token_cache")]
    pub token_cache: PathBuf,

    /// Playlist to fetch
    #[serde(default)]
    pub playlist_id: Option<String>,

    /// Client-credentials id
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client-credentials secret
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Web API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Accounts (token) service base URL
    #[serde(default = "default_accounts_base_url")]
    pub accounts_base_url: String,

    /// Tracks requested per playlist page (default: 20)
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            songs_file: default_songs_file(),
            token_cache: default_token_cache(),
            playlist_id: None,
            client_id: None,
            client_secret: None,
            api_base_url: default_api_base_url(),
            accounts_base_url: default_accounts_base_url(),
            page_limit: default_page_limit(),
        }
    }
}

/// Retry configuration for transient catalog request failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500ms)
    #[serde(default = "default_initial_delay", with = "duration_millis")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for playlist-dl
///
/// Download settings are flattened into the top level; the other groups
/// live in their own tables (`[search]`, `[invidious]`, `[catalog]`, `[retry]`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Destination, worker pool and attempt bounds
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Candidate search and scoring
    #[serde(default)]
    pub search: SearchConfig,

    /// Search index and stream source
    #[serde(default)]
    pub invidious: InvidiousConfig,

    /// Playlist catalog
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Retry policy for catalog requests
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Load a configuration from a TOML file
    ///
    /// Missing keys take their defaults. The result is validated.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings describe a runnable configuration
    pub fn validate(&self) -> Result<()> {
        if self.download.workers == Some(0) {
            return Err(Error::config("workers", "must be greater than zero"));
        }
        if self.download.max_attempts == 0 {
            return Err(Error::config("max_attempts", "must be greater than zero"));
        }
        if self.search.page_size == 0 {
            return Err(Error::config("search.page_size", "must be greater than zero"));
        }
        if self.search.max_page_advances == 0 {
            return Err(Error::config(
                "search.max_page_advances",
                "must be greater than zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.search.acceptability_threshold) {
            return Err(Error::config(
                "search.acceptability_threshold",
                "must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

fn default_destination_dir() -> PathBuf {
    PathBuf::from("songs")
}

fn default_max_attempts() -> u32 {
    5
}

fn default_queue_pull_timeout() -> Duration {
    Duration::from_millis(500)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_advances() -> u32 {
    20
}

fn default_acceptability_threshold() -> f64 {
    0.5
}

fn default_rejected_title_words() -> Vec<String> {
    vec!["COVER".into(), "VOCAL".into()]
}

fn default_privileged_channels() -> Vec<String> {
    vec!["Vevo".into()]
}

fn default_invidious_url() -> String {
    "https://inv.nadeko.net".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_songs_file() -> PathBuf {
    PathBuf::from("songs.json")
}

fn default_token_cache() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_api_base_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_accounts_base_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_page_limit() -> u32 {
    20
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Durations are written as integer milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.download.max_attempts, 5);
        assert_eq!(config.download.queue_pull_timeout, Duration::from_millis(500));
        assert_eq!(config.search.page_size, 10);
        assert_eq!(config.search.max_page_advances, 20);
        assert_eq!(config.search.acceptability_threshold, 0.5);
        assert_eq!(config.search.rejected_title_words, vec!["COVER", "VOCAL"]);
        assert_eq!(config.search.privileged_channels, vec!["Vevo"]);
        assert_eq!(config.search.strategy, SelectionStrategy::FirstAcceptable);
        assert!(config.download.skip_existing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn worker_count_prefers_explicit_value() {
        let config = DownloadConfig {
            workers: Some(7),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 7);

        let auto = DownloadConfig::default();
        assert!(auto.worker_count() >= 1);
    }

    #[test]
    fn toml_with_partial_tables_fills_defaults() {
        let text = r#"
            destination_dir = "/tmp/music"
            workers = 2
            fetch_timeout = 1500

            [search]
            strategy = "best_on_page"

            [catalog]
            playlist_id = "37i9dQZF1DXcBWIGoYBM5M"
        "#;

        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.download.destination_dir, PathBuf::from("/tmp/music"));
        assert_eq!(config.download.workers, Some(2));
        assert_eq!(config.download.fetch_timeout, Duration::from_millis(1500));
        assert_eq!(config.download.max_attempts, 5);
        assert_eq!(config.search.strategy, SelectionStrategy::BestOnPage);
        assert_eq!(config.search.page_size, 10);
        assert_eq!(
            config.catalog.playlist_id.as_deref(),
            Some("37i9dQZF1DXcBWIGoYBM5M")
        );
        assert_eq!(config.catalog.songs_file, PathBuf::from("songs.json"));
    }

    #[test]
    fn from_toml_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "workers = 0\n").unwrap();

        match Config::from_toml_file(&path) {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("workers")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn from_toml_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "workers = \"many\"\n").unwrap();

        let err = Config::from_toml_file(&path).unwrap_err();
        assert!(
            err.to_string().contains("failed to parse"),
            "unexpected message: {}",
            err
        );
    }

    #[test]
    fn validate_rejects_threshold_out_of_range() {
        let mut config = Config::default();
        config.search.acceptability_threshold = 1.5;
        assert!(config.validate().is_err());

        config.search.acceptability_threshold = 0.0;
        config.search.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_advances() {
        let mut config = Config::default();
        config.search.max_page_advances = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Config { key: Some(ref key), .. } if key == "search.max_page_advances"
        ));
    }
}
