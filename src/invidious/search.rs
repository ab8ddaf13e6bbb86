//! Paginated search over `/api/v1/search`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;

use super::{InvidiousClient, watch_link};
use crate::error::SearchError;
use crate::search::{SearchProvider, SearchSession, SortOrder};
use crate::types::SearchResult;

/// Entry of a search response; only videos are of interest
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SearchItem {
    Video(VideoItem),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    title: String,
    video_id: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    view_count: Option<i64>,
    #[serde(default)]
    view_count_text: Option<String>,
}

impl From<VideoItem> for SearchResult {
    fn from(item: VideoItem) -> Self {
        let view_count_text = match item.view_count {
            Some(count) if count >= 0 => Some(format_view_count(count as u64)),
            _ => item.view_count_text,
        };

        Self {
            link: watch_link(&item.video_id),
            id: item.video_id,
            title: item.title,
            channel_name: item.author,
            view_count_text,
        }
    }
}

/// "No views", "1 view" or "1,234 views"
fn format_view_count(count: u64) -> String {
    match count {
        0 => "No views".to_string(),
        1 => "1 view".to_string(),
        n => {
            let digits = n.to_string();
            let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
            for (i, c) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(c);
            }
            format!("{} views", grouped)
        }
    }
}

/// Search session over an Invidious query
///
/// Server pages are buffered and handed out in windows of `page_size`
/// results, so every result of a server page is offered before the next one
/// is requested.
pub struct InvidiousSession {
    client: InvidiousClient,
    query: String,
    order: SortOrder,
    page_size: usize,
    server_page: u32,
    pending: VecDeque<SearchResult>,
    exhausted: bool,
    results: Vec<SearchResult>,
}

impl InvidiousSession {
    /// Last server page (1-based) requested
    pub fn server_page(&self) -> u32 {
        self.server_page
    }

    /// Take the next window of results, fetching a server page if needed
    ///
    /// An empty window means the query has no more results.
    async fn next_window(&mut self) -> Result<Vec<SearchResult>, SearchError> {
        if self.pending.is_empty() && !self.exhausted {
            let next = self.server_page + 1;
            let results = self.fetch_page(next).await?;
            self.server_page = next;
            if results.is_empty() {
                self.exhausted = true;
            }
            self.pending.extend(results);
        }

        let take = self.page_size.min(self.pending.len());
        Ok(self.pending.drain(..take).collect())
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<SearchResult>, SearchError> {
        let sort_by = match self.order {
            SortOrder::ViewCount => "view_count",
            SortOrder::Relevance => "relevance",
        };
        let page_param = page.to_string();

        let response = self
            .client
            .http
            .get(self.client.api_url("search"))
            .query(&[
                ("q", self.query.as_str()),
                ("type", "video"),
                ("sort_by", sort_by),
                ("page", page_param.as_str()),
            ])
            .timeout(self.client.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let items: Vec<SearchItem> =
            serde_json::from_slice(&body).map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                SearchItem::Video(video) => Some(SearchResult::from(video)),
                SearchItem::Other => None,
            })
            .collect())
    }
}

#[async_trait]
impl SearchSession for InvidiousSession {
    fn current_page(&self) -> &[SearchResult] {
        &self.results
    }

    async fn advance_page(&mut self) -> Result<bool, SearchError> {
        let window = self.next_window().await?;
        if window.is_empty() {
            return Ok(false);
        }

        self.results = window;
        Ok(true)
    }
}

#[async_trait]
impl SearchProvider for InvidiousClient {
    async fn open_session(
        &self,
        query: &str,
        order: SortOrder,
        page_size: usize,
    ) -> Result<Box<dyn SearchSession>, SearchError> {
        let mut session = InvidiousSession {
            client: self.clone(),
            query: query.to_string(),
            order,
            page_size: page_size.max(1),
            server_page: 0,
            pending: VecDeque::new(),
            exhausted: false,
            results: Vec::new(),
        };
        session.results = session.next_window().await?;

        tracing::debug!(
            query,
            results = session.results.len(),
            buffered = session.pending.len(),
            "Search session opened"
        );
        Ok(Box::new(session))
    }
}
