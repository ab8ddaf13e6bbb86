//! Utility functions for file naming

/// Characters replaced when a remote title is used as a file name
const RESERVED_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Make a remote title safe to use as a file name
///
/// Reserved and control characters become `_`, surrounding whitespace and
/// trailing dots are dropped. An empty result falls back to `fallback`.
///
/// # Examples
///
/// ```
/// use playlist_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Back In Black", "audio"), "AC_DC_ Back In Black");
/// assert_eq!(sanitize_filename("...", "audio"), "audio");
/// ```
#[must_use]
pub fn sanitize_filename(title: &str, fallback: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if RESERVED_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim_end();

    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

/// `name`, then `name_2`, `name_3`, ... without end
///
/// # Examples
///
/// ```
/// use playlist_dl::utils::unique_name_candidates;
///
/// let names: Vec<_> = unique_name_candidates("Song").take(3).collect();
/// assert_eq!(names, ["Song", "Song_2", "Song_3"]);
/// ```
pub fn unique_name_candidates(name: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(name.to_string()).chain((2u64..).map(move |i| format!("{}_{}", name, i)))
}
