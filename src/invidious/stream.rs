//! Audio stream lookup over `/api/v1/videos/{id}` and streamed download.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

use super::InvidiousClient;
use crate::error::FetchError;
use crate::fetch::{AudioStream, StreamFetcher, partial_path};
use crate::utils::sanitize_filename;

const AUDIO_MIME_PREFIX: &str = "audio/";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VideoResponse {
    Error { error: String },
    Details(VideoDetails),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    title: String,
    #[serde(default)]
    adaptive_formats: Vec<AdaptiveFormat>,
}

#[derive(Debug, Deserialize)]
struct AdaptiveFormat {
    url: String,
    #[serde(rename = "type")]
    mime_type: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    bitrate: u64,
    #[serde(default)]
    container: Option<String>,
}

impl AdaptiveFormat {
    fn is_audio_only(&self) -> bool {
        self.mime_type.starts_with(AUDIO_MIME_PREFIX)
    }

    fn extension(&self) -> String {
        if let Some(container) = self.container.as_deref().filter(|c| !c.is_empty()) {
            return container.to_string();
        }
        let subtype = self
            .mime_type
            .trim_start_matches(AUDIO_MIME_PREFIX)
            .split(';')
            .next()
            .unwrap_or("")
            .trim();
        match subtype {
            "mp4" => "m4a".to_string(),
            "" => "audio".to_string(),
            other => other.to_string(),
        }
    }
}

// Invidious reports bitrates as strings
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u64),
        Text(String),
    }

    Ok(match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n,
        NumberOrText::Text(text) => text.trim().parse().unwrap_or(0),
    })
}

/// Extract the video id from a watch link (`?v=<id>`) or a short link (`/<id>`)
pub(crate) fn video_id_from_link(link: &str) -> Result<String, FetchError> {
    let invalid = || FetchError::InvalidLink {
        link: link.to_string(),
    };
    let url = Url::parse(link).map_err(|_| invalid())?;

    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v")
        && !id.is_empty()
    {
        return Ok(id.into_owned());
    }

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty() && *segment != "watch")
        .map(str::to_string)
        .ok_or_else(invalid)
}

/// Best audio-only stream of a video on an Invidious instance
#[derive(Debug)]
pub struct InvidiousStream {
    http: reqwest::Client,
    url: Url,
    title: String,
    bitrate_kbps: u32,
    extension: String,
}

impl InvidiousStream {
    /// Title of the video, used for the output file name
    pub fn title(&self) -> &str {
        &self.title
    }

    /// File extension of the stream's container
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl InvidiousStream {
    /// Stream the body into `path`, returning the number of bytes written
    async fn write_to(&self, path: &Path) -> Result<u64, FetchError> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl AudioStream for InvidiousStream {
    fn average_bitrate(&self) -> u32 {
        self.bitrate_kbps
    }

    async fn save(&self, destination: &Path) -> Result<PathBuf, FetchError> {
        tokio::fs::create_dir_all(destination).await?;
        let path = destination.join(format!(
            "{}.{}",
            sanitize_filename(&self.title, "audio"),
            self.extension
        ));

        let partial = partial_path(&path);
        let written = match self.write_to(&partial).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, &path).await?;

        tracing::debug!(path = %path.display(), bytes = written, "Audio stream saved");
        Ok(path)
    }
}

#[async_trait]
impl StreamFetcher for InvidiousClient {
    async fn audio_stream(&self, link: &str) -> Result<Box<dyn AudioStream>, FetchError> {
        let video_id = video_id_from_link(link)?;

        let response = self
            .http
            .get(self.api_url(&format!("videos/{}", video_id)))
            .query(&[("local", "true")])
            .timeout(self.request_timeout)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        let details = match serde_json::from_slice::<VideoResponse>(&body) {
            Ok(VideoResponse::Details(details)) if status.is_success() => details,
            Ok(VideoResponse::Error { error }) => {
                return Err(FetchError::Unavailable {
                    video_id,
                    reason: error,
                });
            }
            Ok(VideoResponse::Details(_)) => {
                return Err(FetchError::Unavailable {
                    video_id,
                    reason: format!("status {}", status.as_u16()),
                });
            }
            Err(e) => {
                return Err(FetchError::Unavailable {
                    video_id,
                    reason: format!("status {}: unreadable response: {}", status.as_u16(), e),
                });
            }
        };

        let format = details
            .adaptive_formats
            .into_iter()
            .filter(AdaptiveFormat::is_audio_only)
            .max_by_key(|format| format.bitrate)
            .ok_or_else(|| FetchError::NoAudioStream {
                video_id: video_id.clone(),
            })?;

        // Proxied ("local") stream URLs are relative to the instance
        let base = Url::parse(&format!("{}/", self.base_url)).map_err(|_| {
            FetchError::InvalidLink {
                link: self.base_url.clone(),
            }
        })?;
        let url = base.join(&format.url).map_err(|_| FetchError::InvalidLink {
            link: format.url.clone(),
        })?;

        let bitrate_kbps = u32::try_from((format.bitrate + 500) / 1000).unwrap_or(u32::MAX);
        tracing::debug!(
            video_id = %video_id,
            bitrate_kbps,
            mime_type = %format.mime_type,
            "Audio stream resolved"
        );

        Ok(Box::new(InvidiousStream {
            http: self.http.clone(),
            url,
            extension: format.extension(),
            title: details.title,
            bitrate_kbps,
        }))
    }
}
