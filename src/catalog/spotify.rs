//! Spotify Web API catalog source (client-credentials flow)

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{CatalogConfig, RetryConfig};
use crate::error::{CatalogError, Error, Result};
use crate::retry::with_retry;
use crate::song::{ArtistRecord, SongRecord};

/// Token as cached between runs
#[derive(Debug, Serialize, Deserialize)]
struct CachedToken {
    token: String,
    /// Unix timestamp (seconds) after which the token is no longer used
    expiration_date: f64,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        (Utc::now().timestamp() as f64) < self.expiration_date
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TracksPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    name: String,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistRecord>,
}

impl From<Track> for SongRecord {
    fn from(track: Track) -> Self {
        Self {
            name: track.name,
            link: track.href.unwrap_or_default(),
            artists: track.artists,
        }
    }
}

/// Client for reading playlists from the Spotify Web API
#[derive(Clone, Debug)]
pub struct SpotifyClient {
    http: reqwest::Client,
    api_base_url: String,
    accounts_base_url: String,
    client_id: String,
    client_secret: String,
    token_cache: PathBuf,
    page_limit: u32,
    retry: RetryConfig,
}

impl SpotifyClient {
    /// Create a client from the catalog configuration
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingCredentials`] if the client id or secret is not set.
    pub fn new(config: &CatalogConfig, retry: &RetryConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CatalogError::MissingCredentials("client_id".to_string()))?;
        let client_secret = config
            .client_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| CatalogError::MissingCredentials("client_secret".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("playlist-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            accounts_base_url: config.accounts_base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            token_cache: config.token_cache.clone(),
            page_limit: config.page_limit,
            retry: retry.clone(),
        })
    }

    /// Bearer token, taken from the cache while it has not expired
    pub async fn access_token(&self) -> Result<String> {
        if let Some(cached) = read_cached_token(&self.token_cache).await {
            tracing::debug!("Using cached access token");
            return Ok(cached.token);
        }
        self.refresh_token().await
    }

    /// Request a new token and cache it
    async fn refresh_token(&self) -> Result<String> {
        let response = with_retry(&self.retry, || self.request_token()).await?;

        let expires_at = Utc::now() + ChronoDuration::seconds(response.expires_in);
        let cached = CachedToken {
            token: response.access_token,
            expiration_date: expires_at.timestamp() as f64,
        };
        // A token that cannot be cached is still good for this run
        if let Err(e) = write_cached_token(&self.token_cache, &cached).await {
            tracing::warn!(path = %self.token_cache.display(), error = %e, "Failed to cache access token");
        }

        tracing::info!(expires_at = %expires_at, "Access token obtained");
        Ok(cached.token)
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Unable to retrieve token");
            return Err(CatalogError::Authentication {
                status: status.as_u16(),
            }
            .into());
        }
        Ok(response.json().await?)
    }

    /// All tracks of a playlist, in playlist order
    ///
    /// Pages are followed until the API reports no `next` page. Entries without
    /// a track (removed or unavailable ones) are skipped. A rejected cached
    /// token is replaced once.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SongRecord>> {
        let mut token = self.access_token().await?;
        let mut refreshed = false;
        let mut next_url = Some(format!(
            "{}/v1/playlists/{}/tracks?limit={}",
            self.api_base_url, playlist_id, self.page_limit
        ));
        let mut records = Vec::new();

        while let Some(url) = next_url.take() {
            let page = match with_retry(&self.retry, || self.get_page(&url, &token)).await {
                Ok(page) => page,
                Err(Error::Catalog(CatalogError::UnexpectedStatus { status: 401, .. }))
                    if !refreshed =>
                {
                    tracing::info!("Access token rejected, requesting a new one");
                    token = self.refresh_token().await?;
                    refreshed = true;
                    next_url = Some(url);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let before = records.len();
            records.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.track)
                    .map(SongRecord::from),
            );
            tracing::debug!(url = %url, tracks = records.len() - before, "Playlist page read");
            next_url = page.next;
        }

        tracing::info!(playlist_id, tracks = records.len(), "Playlist loaded");
        Ok(records)
    }

    async fn get_page(&self, url: &str, token: &str) -> Result<TracksPage> {
        let response = self.http.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }
        Ok(response.json().await?)
    }
}

async fn read_cached_token(path: &Path) -> Option<CachedToken> {
    let content = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice::<CachedToken>(&content) {
        Ok(cached) if cached.is_valid() => Some(cached),
        Ok(_) => {
            tracing::debug!(path = %path.display(), "Cached access token expired");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable token cache");
            None
        }
    }
}

async fn write_cached_token(path: &Path, token: &CachedToken) -> Result<()> {
    let json = serde_json::to_vec_pretty(token)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
