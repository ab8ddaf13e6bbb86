//! Candidate scoring
//!
//! Two separate questions are answered here:
//! - **Acceptability**: may this search result be selected for the song at all?
//! - **Ranking**: given two acceptable results, which one should win?
//!
//! Acceptability is a recall-style check: the song title (without decorations)
//! is split into words, short words are ignored, and the share of remaining
//! words found in the video title must reach the threshold. Covers and vocal
//! versions are rejected outright.

use crate::config::SearchConfig;
use crate::song::Song;
use crate::types::{ExclusionSet, SearchResult};

/// Minimum title match ratio (inclusive)
pub const ACCEPTABILITY_THRESHOLD: f64 = 0.5;

/// Title words that disqualify a candidate
pub const REJECTED_TITLE_WORDS: &[&str] = &["COVER", "VOCAL"];

/// Channel trusted for every song
pub const DEFAULT_PRIVILEGED_CHANNEL: &str = "Vevo";

/// Words of this length or shorter do not count towards the match ratio
const MAX_IGNORED_WORD_LEN: usize = 2;

const NO_VIEWS: &str = "No views";

/// Which of two compared candidates wins
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winner {
    /// The first argument
    First,
    /// The second argument
    Second,
}

/// Why a candidate was not acceptable
#[derive(Clone, Debug, PartialEq)]
pub enum Rejection {
    /// Rejected earlier for this song
    Excluded,
    /// Too few title words matched
    LowMatch {
        /// Ratio that was reached
        ratio: f64,
    },
    /// Title contains a disqualifying word
    RejectedWord(String),
}

/// Acceptability rules: threshold and disqualifying words
#[derive(Clone, Debug)]
pub struct AcceptanceRules {
    threshold: f64,
    rejected_words: Vec<String>,
}

impl Default for AcceptanceRules {
    fn default() -> Self {
        Self::new(
            ACCEPTABILITY_THRESHOLD,
            REJECTED_TITLE_WORDS.iter().map(|w| w.to_string()),
        )
    }
}

impl From<&SearchConfig> for AcceptanceRules {
    fn from(config: &SearchConfig) -> Self {
        Self::new(
            config.acceptability_threshold,
            config.rejected_title_words.iter().cloned(),
        )
    }
}

impl AcceptanceRules {
    /// Create rules; rejected words are matched case-insensitively
    pub fn new(threshold: f64, rejected_words: impl IntoIterator<Item = String>) -> Self {
        Self {
            threshold,
            rejected_words: rejected_words
                .into_iter()
                .map(|w| w.to_uppercase())
                .collect(),
        }
    }

    /// Reason the candidate must not be selected, or `None` if it is acceptable
    pub fn rejection(
        &self,
        candidate: &SearchResult,
        song: &Song,
        excluded: &ExclusionSet,
    ) -> Option<Rejection> {
        if excluded.contains(&candidate.id) {
            return Some(Rejection::Excluded);
        }

        let title = candidate.title.to_uppercase();
        let ratio = title_match_ratio(&song.name_without_decorations().to_uppercase(), &title);
        if ratio < self.threshold {
            return Some(Rejection::LowMatch { ratio });
        }

        self.rejected_words
            .iter()
            .find(|word| title.contains(word.as_str()))
            .map(|word| Rejection::RejectedWord(word.clone()))
    }

    /// Whether the candidate may be selected for the song
    pub fn is_acceptable(
        &self,
        candidate: &SearchResult,
        song: &Song,
        excluded: &ExclusionSet,
    ) -> bool {
        self.rejection(candidate, song, excluded).is_none()
    }
}

/// Whether the candidate may be selected for the song, with the default rules
pub fn is_acceptable(candidate: &SearchResult, song: &Song, excluded: &ExclusionSet) -> bool {
    AcceptanceRules::default().is_acceptable(candidate, song, excluded)
}

/// Share of the song title's significant words contained in the video title
///
/// Both titles must already be case-normalized. Words of two characters or
/// fewer are ignored; if none remain the ratio is 1.0.
pub fn title_match_ratio(song_title: &str, video_title: &str) -> f64 {
    let words: Vec<&str> = song_title
        .split_whitespace()
        .filter(|w| w.chars().count() > MAX_IGNORED_WORD_LEN)
        .collect();
    if words.is_empty() {
        return 1.0;
    }

    let found = words.iter().filter(|w| video_title.contains(*w)).count();
    found as f64 / words.len() as f64
}

/// Channels trusted for a song: the configured ones plus each artist name without spaces
pub fn privileged_channels(song: &Song, configured: &[String]) -> Vec<String> {
    configured
        .iter()
        .cloned()
        .chain(song.artists().iter().map(|a| a.replace(' ', "")))
        .collect()
}

/// Whether the candidate was uploaded by one of the privileged channels
pub fn is_privileged_channel(privileged: &[String], candidate: &SearchResult) -> bool {
    privileged
        .iter()
        .any(|channel| candidate.channel_name.contains(channel.as_str()))
}

/// Rank two acceptable candidates
///
/// The first rule that discriminates decides:
/// 1. a candidate without views loses,
/// 2. a candidate whose title lacks the song name loses,
/// 3. the higher view count wins (ties go to the second candidate).
pub fn compare(a: &SearchResult, b: &SearchResult, song: &Song) -> Winner {
    if has_no_views(a) {
        return Winner::Second;
    }
    if has_no_views(b) {
        return Winner::First;
    }
    if !a.title.contains(song.name()) {
        return Winner::Second;
    }
    if !b.title.contains(song.name()) {
        return Winner::First;
    }

    if view_count(a) > view_count(b) {
        Winner::First
    } else {
        Winner::Second
    }
}

/// Leading integer of a view count text such as "1,234,567 views"
///
/// Returns `None` if the text does not start with a number.
pub fn parse_view_count(text: &str) -> Option<u64> {
    text.split_whitespace()
        .next()
        .map(|first| first.replace(',', ""))
        .and_then(|digits| digits.parse().ok())
}

fn has_no_views(candidate: &SearchResult) -> bool {
    match candidate.view_count_text.as_deref() {
        None => true,
        Some(text) => text == NO_VIEWS,
    }
}

fn view_count(candidate: &SearchResult) -> u64 {
    candidate
        .view_count_text
        .as_deref()
        .and_then(parse_view_count)
        .unwrap_or(0)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn song(name: &str, artists: &[&str]) -> Song {
        Song::new(name, artists.iter().map(|a| a.to_string()).collect(), "x").unwrap()
    }

    fn candidate(id: &str, title: &str, views: Option<&str>) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            title: title.to_string(),
            channel_name: "Some Channel".to_string(),
            view_count_text: views.map(str::to_string),
            link: format!("https://www.youtube.com/watch?v={}", id),
        }
    }

    #[test]
    fn exact_title_is_accepted() {
        let s = song("Bohemian Rhapsody", &["Queen"]);
        let c = candidate(
            "abc",
            "Queen - Bohemian Rhapsody (Official Video)",
            Some("100,000 views"),
        );
        assert!(is_acceptable(&c, &s, &ExclusionSet::new()));
    }

    #[test]
    fn match_ratio_ignores_short_words() {
        assert_eq!(title_match_ratio("I AM A ROCK", "SIMON - A ROCK"), 1.0);
        assert_eq!(title_match_ratio("GO", "ANYTHING"), 1.0);
        assert_eq!(title_match_ratio("", "ANYTHING"), 1.0);
        assert_eq!(title_match_ratio("ALPHA BRAVO", "ALPHA"), 0.5);
        assert_eq!(title_match_ratio("ALPHA BRAVO", "NOTHING"), 0.0);
    }

    #[test]
    fn match_is_case_insensitive_and_uses_decoration_free_name() {
        let s = song("Bohemian Rhapsody - Remastered 2011", &["Queen"]);
        let c = candidate("abc", "queen bohemian rhapsody", Some("5 views"));
        assert!(is_acceptable(&c, &s, &ExclusionSet::new()));
    }

    #[test]
    fn half_of_the_words_is_the_inclusive_boundary() {
        let words: Vec<String> = (0..100).map(|i| format!("w{:03}", i)).collect();
        let s = song(&words.join(" "), &["Artist"]);

        let fifty = candidate("fifty", &words[..50].join(" "), Some("1 view"));
        assert!(is_acceptable(&fifty, &s, &ExclusionSet::new()));

        let forty_nine = candidate("forty-nine", &words[..49].join(" "), Some("1 view"));
        assert!(!is_acceptable(&forty_nine, &s, &ExclusionSet::new()));

        let s = song("Alpha Bravo Charlie Delta", &["Artist"]);
        let half = candidate("half", "alpha charlie", Some("1 view"));
        assert!(is_acceptable(&half, &s, &ExclusionSet::new()));
        let quarter = candidate("quarter", "alpha", Some("1 view"));
        assert_eq!(
            AcceptanceRules::default().rejection(&quarter, &s, &ExclusionSet::new()),
            Some(Rejection::LowMatch { ratio: 0.25 })
        );
    }

    #[test]
    fn covers_and_vocal_versions_are_rejected() {
        let s = song("Bohemian Rhapsody", &["Queen"]);
        let excluded = ExclusionSet::new();

        for title in [
            "Bohemian Rhapsody (cover)",
            "Bohemian Rhapsody COVER by someone",
            "Bohemian Rhapsody - Cover",
            "Bohemian Rhapsody vocals only",
            "Bohemian Rhapsody (Vocal Track)",
        ] {
            let c = candidate("c", title, Some("1,000,000 views"));
            assert!(!is_acceptable(&c, &s, &excluded), "{} should be rejected", title);
        }
    }

    #[test]
    fn excluded_ids_are_rejected() {
        let s = song("Bohemian Rhapsody", &["Queen"]);
        let c = candidate("abc", "Queen - Bohemian Rhapsody", Some("10 views"));
        let excluded: ExclusionSet = ["abc"].into_iter().collect();

        assert_eq!(
            AcceptanceRules::default().rejection(&c, &s, &excluded),
            Some(Rejection::Excluded)
        );
    }

    #[test]
    fn configured_rules_replace_defaults() {
        let rules = AcceptanceRules::new(1.0, vec!["karaoke".to_string()]);
        let s = song("Alpha Bravo", &["Artist"]);

        let partial = candidate("p", "Alpha", Some("1 view"));
        assert!(!rules.is_acceptable(&partial, &s, &ExclusionSet::new()));

        let karaoke = candidate("k", "Alpha Bravo Karaoke", Some("1 view"));
        assert_eq!(
            rules.rejection(&karaoke, &s, &ExclusionSet::new()),
            Some(Rejection::RejectedWord("KARAOKE".to_string()))
        );

        let cover = candidate("c", "Alpha Bravo cover", Some("1 view"));
        assert!(rules.is_acceptable(&cover, &s, &ExclusionSet::new()));
    }

    #[test]
    fn privileged_channels_include_artists_without_spaces() {
        let s = song("Song", &["Daft Punk", "Pharrell Williams"]);
        let channels = privileged_channels(&s, &["Vevo".to_string()]);
        assert_eq!(channels, vec!["Vevo", "DaftPunk", "PharrellWilliams"]);

        let mut c = candidate("a", "Song", Some("1 view"));
        c.channel_name = "DaftPunkVEVO".to_string();
        assert!(is_privileged_channel(&channels, &c));

        c.channel_name = "PharrellWilliamsVevo".to_string();
        assert!(is_privileged_channel(&channels, &c));

        c.channel_name = "Random Uploads".to_string();
        assert!(!is_privileged_channel(&channels, &c));
    }

    #[test]
    fn no_views_loses_even_with_better_title() {
        let s = song("Bohemian Rhapsody", &["Queen"]);
        let a = candidate("a", "Bohemian Rhapsody", Some("No views"));
        let b = candidate("b", "Something else entirely", Some("1,000 views"));

        assert_eq!(compare(&a, &b, &s), Winner::Second);
        assert_eq!(compare(&b, &a, &s), Winner::First);
    }

    #[test]
    fn missing_view_text_loses() {
        let s = song("Bohemian Rhapsody", &["Queen"]);
        let a = candidate("a", "Bohemian Rhapsody", None);
        let b = candidate("b", "Bohemian Rhapsody", Some("3 views"));

        assert_eq!(compare(&a, &b, &s), Winner::Second);
        assert_eq!(compare(&b, &a, &s), Winner::First);
    }

    #[test]
    fn title_containment_beats_view_count() {
        let s = song("Bohemian Rhapsody", &["Queen"]);
        let a = candidate("a", "Queen live at Wembley", Some("9,000,000 views"));
        let b = candidate("b", "Queen - Bohemian Rhapsody", Some("1,000 views"));

        assert_eq!(compare(&a, &b, &s), Winner::Second);
        assert_eq!(compare(&b, &a, &s), Winner::First);
    }

    #[test]
    fn higher_view_count_wins_otherwise() {
        let s = song("Bohemian Rhapsody", &["Queen"]);
        let a = candidate("a", "Bohemian Rhapsody", Some("1,234,567 views"));
        let b = candidate("b", "Bohemian Rhapsody (Live)", Some("999,999 views"));

        assert_eq!(compare(&a, &b, &s), Winner::First);
        assert_eq!(compare(&b, &a, &s), Winner::Second);
        assert_eq!(compare(&a, &a, &s), Winner::Second);
    }

    #[test]
    fn view_count_parsing() {
        assert_eq!(parse_view_count("1,234,567 views"), Some(1_234_567));
        assert_eq!(parse_view_count("1 view"), Some(1));
        assert_eq!(parse_view_count("42"), Some(42));
        assert_eq!(parse_view_count("No views"), None);
        assert_eq!(parse_view_count("1.2M views"), None);
        assert_eq!(parse_view_count(""), None);
    }
}
