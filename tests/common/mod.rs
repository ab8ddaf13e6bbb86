//! Common test utilities for playlist-dl integration tests
//!
//! A wiremock server stands in for an Invidious instance.

#![allow(dead_code)]

use serde_json::json;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use playlist_dl::Config;

/// Config pointing at the mock instance and writing below `dir`
pub fn config_for(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.invidious.base_url = server.uri();
    config.download.destination_dir = dir.join("songs");
    config.download.workers = Some(2);
    config.download.queue_pull_timeout = Duration::from_millis(200);
    config.download.fetch_timeout = Duration::from_secs(10);
    config.catalog.songs_file = dir.join("songs.json");
    config
}

/// Search result entry as returned by `/api/v1/search`
pub fn video(id: &str, title: &str, author: &str, views: i64) -> serde_json::Value {
    json!({
        "type": "video",
        "title": title,
        "videoId": id,
        "author": author,
        "authorId": "UC000",
        "viewCount": views,
        "lengthSeconds": 300
    })
}

/// Answer `query` with a single page of results
pub async fn mount_search(server: &MockServer, query: &str, results: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .and(query_param("q", query))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results))
        .mount(server)
        .await;
    // Later pages are empty
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .and(query_param("q", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Serve video details with one audio format and its bytes
pub async fn mount_video(server: &MockServer, id: &str, title: &str, bitrate: u64, data: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/videos/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": title,
            "videoId": id,
            "adaptiveFormats": [
                {
                    "url": format!("/videoplayback?id={}", id),
                    "type": "audio/webm; codecs=\"opus\"",
                    "bitrate": bitrate.to_string(),
                    "container": "webm"
                }
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/videoplayback"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(data.to_vec()))
        .mount(server)
        .await;
}

/// Serve an "unavailable" error for a video
pub async fn mount_unavailable(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/videos/{}", id)))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "This video is private"})),
        )
        .mount(server)
        .await;
}
