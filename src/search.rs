//! Paginated video search and candidate selection
//!
//! A [`SearchProvider`] opens a stateful [`SearchSession`] for a query. The
//! [`Selector`] walks the session page by page and returns the first candidate
//! the scoring rules accept, skipping ids already rejected for the song.

use async_trait::async_trait;

use crate::config::{SearchConfig, SelectionStrategy};
use crate::error::SearchError;
use crate::scoring::{self, AcceptanceRules, Winner};
use crate::song::Song;
use crate::types::{ExclusionSet, SearchResult};

/// Result ordering requested from the index
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most viewed first
    #[default]
    ViewCount,
    /// Index relevance
    Relevance,
}

/// Cursor over the pages of one search
#[async_trait]
pub trait SearchSession: Send {
    /// Results of the current page, in index order
    fn current_page(&self) -> &[SearchResult];

    /// Move to the next page
    ///
    /// Returns `false` when there are no more results; the current page is
    /// then left unchanged.
    async fn advance_page(&mut self) -> Result<bool, SearchError>;
}

/// Search index able to open sessions
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run the query and position a new session on its first page
    async fn open_session(
        &self,
        query: &str,
        order: SortOrder,
        page_size: usize,
    ) -> Result<Box<dyn SearchSession>, SearchError>;
}

/// Picks a candidate for a song out of a search session
#[derive(Clone, Debug)]
pub struct Selector {
    rules: AcceptanceRules,
    max_page_advances: u32,
    strategy: SelectionStrategy,
}

impl Default for Selector {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl Selector {
    /// Create a selector from the search configuration
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            rules: AcceptanceRules::from(config),
            max_page_advances: config.max_page_advances,
            strategy: config.strategy,
        }
    }

    /// Acceptability rules in use
    pub fn rules(&self) -> &AcceptanceRules {
        &self.rules
    }

    /// Find a candidate for the song
    ///
    /// Scans the current page and then advances, at most `max_page_advances`
    /// times; the first page is always scanned. `Ok(None)` means nothing acceptable was found; errors only come
    /// from the session itself.
    pub async fn select(
        &self,
        song: &Song,
        session: &mut dyn SearchSession,
        excluded: &ExclusionSet,
    ) -> Result<Option<SearchResult>, SearchError> {
        for page in 1..=self.max_page_advances.max(1) {
            if let Some(candidate) = self.pick_from_page(session.current_page(), song, excluded) {
                tracing::debug!(
                    page,
                    video_id = %candidate.id,
                    title = %candidate.title,
                    "Acceptable candidate found"
                );
                return Ok(Some(candidate));
            }

            if !session.advance_page().await? {
                tracing::debug!(page, "Search results exhausted");
                return Ok(None);
            }
        }

        tracing::debug!(
            max_page_advances = self.max_page_advances,
            "Page limit reached without an acceptable candidate"
        );
        Ok(None)
    }

    fn pick_from_page(
        &self,
        page: &[SearchResult],
        song: &Song,
        excluded: &ExclusionSet,
    ) -> Option<SearchResult> {
        let mut acceptable = page.iter().filter(|candidate| {
            match self.rules.rejection(candidate, song, excluded) {
                None => true,
                Some(reason) => {
                    tracing::trace!(
                        video_id = %candidate.id,
                        title = %candidate.title,
                        reason = ?reason,
                        "Candidate rejected"
                    );
                    false
                }
            }
        });

        let chosen = match self.strategy {
            SelectionStrategy::FirstAcceptable => acceptable.next(),
            SelectionStrategy::BestOnPage => {
                acceptable.reduce(|best, next| match scoring::compare(best, next, song) {
                    Winner::First => best,
                    Winner::Second => next,
                })
            }
        };
        chosen.cloned()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory session over fixed pages
    pub(crate) struct PagedSession {
        pages: Vec<Vec<SearchResult>>,
        index: usize,
        pub(crate) advances: usize,
    }

    impl PagedSession {
        pub(crate) fn new(pages: Vec<Vec<SearchResult>>) -> Self {
            Self {
                pages,
                index: 0,
                advances: 0,
            }
        }
    }

    #[async_trait]
    impl SearchSession for PagedSession {
        fn current_page(&self) -> &[SearchResult] {
            self.pages.get(self.index).map(Vec::as_slice).unwrap_or(&[])
        }

        async fn advance_page(&mut self) -> Result<bool, SearchError> {
            self.advances += 1;
            if self.index + 1 < self.pages.len() {
                self.index += 1;
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    pub(crate) fn result(id: &str, title: &str, views: &str) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            title: title.to_string(),
            channel_name: "Channel".to_string(),
            view_count_text: Some(views.to_string()),
            link: format!("https://www.youtube.com/watch?v={}", id),
        }
    }
}
