use super::*;
use crate::downloader::test_helpers::{
    FetchBehavior, ScriptedFetcher, ScriptedSearch, create_test_downloader, result, song,
    test_config,
};
use crate::types::{Event, OutcomeStatus, SearchResult, SongId};


/// Drain every event already sent to `rx`
fn collect_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
