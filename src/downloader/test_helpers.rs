//! Shared fakes for exercising SongDownloader without a network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::downloader::SongDownloader;
use crate::error::{FetchError, SearchError};
use crate::fetch::{AudioStream, StreamFetcher, partial_path};
use crate::search::testing::PagedSession;
use crate::search::{SearchProvider, SearchSession, SortOrder};
use crate::song::Song;
use crate::types::SearchResult;

pub(crate) use crate::search::testing::result;

/// Search provider answering each query with fixed pages
#[derive(Default)]
pub(crate) struct ScriptedSearch {
    pages: HashMap<String, Vec<Vec<SearchResult>>>,
    failing: bool,
    opened: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every query fails with a 503
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_pages(mut self, query: &str, pages: Vec<Vec<SearchResult>>) -> Self {
        self.pages.insert(query.to_string(), pages);
        self
    }

    /// Queries of every opened session, in order
    pub(crate) fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub(crate) fn open_count(&self, query: &str) -> usize {
        self.opened().iter().filter(|q| q.as_str() == query).count()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn open_session(
        &self,
        query: &str,
        _order: SortOrder,
        _page_size: usize,
    ) -> Result<Box<dyn SearchSession>, SearchError> {
        self.opened.lock().unwrap().push(query.to_string());
        if self.failing {
            return Err(SearchError::UnexpectedStatus { status: 503 });
        }
        let pages = self.pages.get(query).cloned().unwrap_or_default();
        Ok(Box::new(PagedSession::new(pages)))
    }
}

/// How the fake fetcher treats a video id
#[derive(Clone, Debug)]
pub(crate) enum FetchBehavior {
    Succeed { bitrate: u32 },
    Unavailable,
    Hang,
    /// Stream resolves, then stalls after writing part of the audio
    StallWhileSaving,
}

/// Stream fetcher with per-video scripted behavior
pub(crate) struct ScriptedFetcher {
    behaviors: HashMap<String, FetchBehavior>,
    default: FetchBehavior,
    fetched: Mutex<Vec<String>>,
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self {
            behaviors: HashMap::new(),
            default: FetchBehavior::Succeed { bitrate: 128 },
            fetched: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedFetcher {
    /// Every video succeeds at 128 kbps unless scripted otherwise
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, video_id: &str, behavior: FetchBehavior) -> Self {
        self.behaviors.insert(video_id.to_string(), behavior);
        self
    }

    /// Video ids passed to `audio_stream`, in order
    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

fn video_id(link: &str) -> String {
    link.rsplit("v=").next().unwrap_or(link).to_string()
}

#[async_trait]
impl StreamFetcher for ScriptedFetcher {
    async fn audio_stream(&self, link: &str) -> Result<Box<dyn AudioStream>, FetchError> {
        let id = video_id(link);
        self.fetched.lock().unwrap().push(id.clone());

        match self.behaviors.get(&id).unwrap_or(&self.default) {
            FetchBehavior::Succeed { bitrate } => Ok(Box::new(FakeStream {
                bitrate: *bitrate,
                file_name: format!("{}.webm", id),
                stall: false,
            })),
            FetchBehavior::StallWhileSaving => Ok(Box::new(FakeStream {
                bitrate: 128,
                file_name: format!("{}.webm", id),
                stall: true,
            })),
            FetchBehavior::Unavailable => Err(FetchError::Unavailable {
                video_id: id,
                reason: "This video is unavailable".to_string(),
            }),
            FetchBehavior::Hang => std::future::pending().await,
        }
    }
}

struct FakeStream {
    bitrate: u32,
    file_name: String,
    stall: bool,
}

#[async_trait]
impl AudioStream for FakeStream {
    fn average_bitrate(&self) -> u32 {
        self.bitrate
    }

    async fn save(&self, destination: &Path) -> Result<PathBuf, FetchError> {
        tokio::fs::create_dir_all(destination).await?;
        let path = destination.join(&self.file_name);
        let partial = partial_path(&path);
        tokio::fs::write(&partial, b"aud").await?;
        if self.stall {
            std::future::pending::<()>().await;
        }
        tokio::fs::write(&partial, b"audio").await?;
        tokio::fs::rename(&partial, &path).await?;
        Ok(path)
    }
}

/// Config writing into `dir`, with short timeouts
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.destination_dir = dir.join("songs");
    config.download.workers = Some(2);
    config.download.queue_pull_timeout = Duration::from_millis(200);
    config.download.fetch_timeout = Duration::from_secs(5);
    config
}

/// Downloader over the given fakes; the returned Arcs observe the calls
pub(crate) fn create_test_downloader(
    config: Config,
    search: ScriptedSearch,
    fetcher: ScriptedFetcher,
) -> (SongDownloader, Arc<ScriptedSearch>, Arc<ScriptedFetcher>) {
    let search = Arc::new(search);
    let fetcher = Arc::new(fetcher);
    let downloader = SongDownloader::new(config, search.clone(), fetcher.clone()).unwrap();
    (downloader, search, fetcher)
}

pub(crate) fn song(name: &str, artists: &[&str]) -> Song {
    Song::new(
        name,
        artists.iter().map(|a| a.to_string()).collect(),
        format!("https://open.spotify.com/track/{}", name.len()),
    )
    .unwrap()
}
