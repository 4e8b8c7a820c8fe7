//! Author-name tokenization with noise filtering

use super::non_placeholder;

/// Tokens shorter than this are initials, stray punctuation or `N.Y.`
pub const MIN_AUTHOR_LENGTH: usize = 4;
/// Tokens this long are rejected, not truncated
pub const MAX_AUTHOR_LENGTH: usize = 200;
/// Raw values longer than this are also split on commas
pub const WIDE_SPLIT_THRESHOLD: usize = 60;

/// Substrings marking a token as boilerplate rather than a name
const NOISE_CLUES: &[&str] = &[
    "www.",
    "http:",
    "&quot",
    "part 1 of",
    "part 2 of",
    "Copyright",
    "(c)",
    "All rights reserved",
    "he said",
];

/// Split a raw author field into plausible names.
///
/// Separators are `;` and `/`; a raw value longer than
/// [`WIDE_SPLIT_THRESHOLD`] characters is also split on `,`, since it
/// likely lists several `Last, First` names. Placeholders, short tokens,
/// boilerplate and oversized tokens are dropped.
pub fn tokenize_authors(raw: &str) -> Vec<String> {
    let wide = raw.chars().count() > WIDE_SPLIT_THRESHOLD;
    raw.split(|c: char| c == ';' || c == '/' || (wide && c == ','))
        .filter_map(non_placeholder)
        .filter(|name| is_plausible_name(name))
        .map(str::to_string)
        .collect()
}

fn is_plausible_name(name: &str) -> bool {
    let len = name.chars().count();
    if !(MIN_AUTHOR_LENGTH..MAX_AUTHOR_LENGTH).contains(&len) {
        log::trace!("author token dropped by length ({len}): {name}");
        return false;
    }
    !NOISE_CLUES.iter().any(|clue| name.contains(clue))
}
