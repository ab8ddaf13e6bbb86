//! Invidious API client
//!
//! Implements both collaborators the downloader needs on top of an Invidious
//! instance:
//! - [`search`] - paginated video search ([`SearchProvider`](crate::search::SearchProvider))
//! - [`stream`] - audio-only stream lookup and download ([`StreamFetcher`](crate::fetch::StreamFetcher))

mod search;
mod stream;

pub use search::InvidiousSession;
pub use stream::InvidiousStream;

use std::time::Duration;

use crate::config::InvidiousConfig;
use crate::error::Result;

/// Watch URL used as the opaque link of search results
const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Client for one Invidious instance (cheap to clone)
#[derive(Clone, Debug)]
pub struct InvidiousClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl InvidiousClient {
    /// Create a client for the configured instance
    ///
    /// The request timeout bounds API calls; audio downloads are bounded by the
    /// downloader's fetch timeout instead.
    pub fn new(config: &InvidiousConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .user_agent(concat!("playlist-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
        })
    }

    /// Base URL of the instance
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }
}

/// Link of the watch page for a video id
pub(crate) fn watch_link(video_id: &str) -> String {
    format!("{}?v={}", WATCH_URL, video_id)
}
