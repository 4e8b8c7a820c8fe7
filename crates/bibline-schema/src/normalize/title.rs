//! Title handling: container disambiguation and combined titles

use std::sync::LazyLock;

use regex::Regex;

/// Words in an article title hinting that the source is a periodical
const JOURNAL_CUES: &[&str] = &["zeitschrift", "journal"];

/// `Editors (Hrsg.): Book Title (Place: Publisher, Year), pages`
static BOOK_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^:]*):([^(]*)").expect("valid book title regex"));

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));

/// Where an article was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Journal(String),
    Book(String),
}

/// Decide whether `source` names a journal or is a book citation.
///
/// Journal when the article title carries a journal cue or the record has
/// ISSNs; the raw source string is then the journal title. Otherwise the
/// book title is cut out of the citation.
pub fn classify_container(article_title: &str, source: &str, has_issn: bool) -> Container {
    let lower = article_title.to_lowercase();
    if has_issn || JOURNAL_CUES.iter().any(|cue| lower.contains(cue)) {
        Container::Journal(source.trim().to_string())
    } else {
        Container::Book(book_title(source))
    }
}

/// Second group of `([^:]*):([^(]*)` over the citation with newlines folded,
/// or the folded citation itself when there is no match.
pub fn book_title(citation: &str) -> String {
    let folded = fold_newlines(citation);
    match BOOK_TITLE.captures(&folded) {
        Some(caps) => caps[2].trim().to_string(),
        None => folded,
    }
}

/// Replace newlines with spaces
pub fn fold_newlines(s: &str) -> String {
    s.replace('\n', " ")
}

/// `title : subtitle`, or whichever of the two is present
pub fn combined_title(title: Option<&str>, subtitle: Option<&str>) -> String {
    match (title, subtitle) {
        (Some(t), Some(s)) => format!("{t} : {s}"),
        (Some(t), None) => t.to_string(),
        (None, Some(s)) => s.to_string(),
        (None, None) => String::new(),
    }
}

/// Title without inline markup such as `<i>` or `<sub>`
pub fn strip_markup(title: &str) -> String {
    MARKUP.replace_all(title, "").trim().to_string()
}

/// Lowercased title without leading punctuation, for sorting
pub fn sortable_title(title: &str) -> String {
    strip_markup(title)
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}
